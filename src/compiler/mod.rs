//! The compiler's stateful core: the group stack, per-track bytecode
//! assembly, and the pools of instruments/waveforms/samples being built up
//! as commands stream in from the (external) lexer.

mod emit;

use std::path::PathBuf;

use crate::bytebuffer::ByteBuffer;
use crate::command::{Command, TokenKind};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CompileError, CompileResult};
use crate::instrument::Instrument;
use crate::sample::SampleData;
use crate::slotted::Slotted;
use crate::tables::{CommandKind, MAX_GROUP};
use crate::waveform::WaveformData;

/// Which track a frame (or a bytecode destination) belongs to. The global
/// track is distinct from the user-defined tracks list — it is linked
/// first and its code precedes every `track` block's own code in final
/// playback order only insofar as the engine wrapper chooses to run it
/// first; the compiler itself just keeps it separate, per §3/§4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRef {
    Global,
    User(usize),
}

/// Identifies exactly which `ByteBuffer` a frame is currently appending to:
/// either a track's global buffer, or one of its numbered group buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRef {
    TrackGlobal(TrackRef),
    Group(TrackRef, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    TrackDef,
    InstrumentDef,
    WaveformDef,
    SampleDef,
    GroupDef,
}

/// One entry on the compiler's group stack.
#[derive(Debug, Clone)]
pub struct GroupFrame {
    pub level: usize,
    pub kind: GroupKind,
    pub track: TrackRef,
    pub buffer: BufferRef,
    /// Whether the most recent `Attack` written into this frame's buffer
    /// was a multi-note arpeggio, so the next bare `Attack`/`Mute` knows
    /// whether it must emit an explicit arpeggio-off first.
    pub arpeggio_active: bool,
}

/// Per-track compiler state: its numbered group buffers, its own global
/// buffer, and the handful of attributes fixed at `track` declaration time.
#[derive(Debug, Clone, Default)]
pub struct CompilerTrack {
    pub global_buffer: ByteBuffer,
    pub group_buffers: Slotted<ByteBuffer>,
    pub initial_waveform: i16,
    pub slot: Option<usize>,
}

impl CompilerTrack {
    fn new(initial_waveform: i16, slot: Option<usize>) -> Self {
        CompilerTrack { global_buffer: ByteBuffer::new(), group_buffers: Slotted::new(), initial_waveform, slot }
    }
}

/// The finished, linked output of a compilation: one self-contained
/// bytecode image per track plus the shared pools it references by index.
#[derive(Debug, Clone)]
pub struct CompiledTracks {
    pub global_track: CompilerTrack,
    pub tracks: Vec<CompilerTrack>,
    pub instruments: Slotted<Instrument>,
    pub waveforms: Slotted<WaveformData>,
    pub samples: Slotted<SampleData>,
}

pub struct Compiler {
    pub(crate) stack: Vec<GroupFrame>,
    pub(crate) tracks: Vec<CompilerTrack>,
    pub(crate) global_track: CompilerTrack,
    pub(crate) instruments: Slotted<Instrument>,
    pub(crate) waveforms: Slotted<WaveformData>,
    pub(crate) samples: Slotted<SampleData>,
    pub(crate) current_instrument: Option<usize>,
    pub(crate) current_waveform: Option<usize>,
    pub(crate) current_sample: Option<usize>,
    pub(crate) load_path: Option<PathBuf>,
    pub(crate) step_ticks: i16,
    pub(crate) last_line: i32,
    pub(crate) ignore_group_level: Option<usize>,
    diagnostics: Box<dyn Diagnostics>,
}

impl Compiler {
    pub fn new(diagnostics: Box<dyn Diagnostics>) -> Self {
        let mut compiler = Compiler {
            stack: Vec::new(),
            tracks: Vec::new(),
            global_track: CompilerTrack::new(0, None),
            instruments: Slotted::new(),
            waveforms: Slotted::new(),
            samples: Slotted::new(),
            current_instrument: None,
            current_waveform: None,
            current_sample: None,
            load_path: None,
            step_ticks: crate::tables::DEFAULT_STEPTICKS,
            last_line: -1,
            ignore_group_level: None,
            diagnostics,
        };
        compiler.reset(false);
        compiler
    }

    fn report(&self, line: i32, col: i32, message: impl Into<String>) {
        self.diagnostics.report(Diagnostic::warning(line, col, message));
    }

    fn is_ignoring(&self) -> bool {
        self.ignore_group_level.is_some()
    }

    pub(crate) fn top(&self) -> &GroupFrame {
        self.stack.last().expect("group stack is never empty after reset")
    }

    pub(crate) fn top_mut(&mut self) -> &mut GroupFrame {
        self.stack.last_mut().expect("group stack is never empty after reset")
    }

    pub(crate) fn buffer_mut(&mut self, buffer: BufferRef) -> &mut ByteBuffer {
        match buffer {
            BufferRef::TrackGlobal(TrackRef::Global) => &mut self.global_track.global_buffer,
            BufferRef::TrackGlobal(TrackRef::User(i)) => &mut self.tracks[i].global_buffer,
            BufferRef::Group(TrackRef::Global, slot) => {
                if self.global_track.group_buffers.is_vacant(slot) {
                    self.global_track.group_buffers.set(slot, ByteBuffer::new());
                }
                self.global_track.group_buffers.get_mut(slot).expect("just ensured present")
            }
            BufferRef::Group(TrackRef::User(i), slot) => {
                if self.tracks[i].group_buffers.is_vacant(slot) {
                    self.tracks[i].group_buffers.set(slot, ByteBuffer::new());
                }
                self.tracks[i].group_buffers.get_mut(slot).expect("just ensured present")
            }
        }
    }

    /// Emits a `LineNo` instruction into the current buffer if (and only
    /// if) `line` differs from the last one written, so two consecutive
    /// `LineNo`s never carry the same value.
    fn maybe_emit_lineno(&mut self, line: i32) {
        if line != self.last_line {
            self.last_line = line;
            let buffer = self.top().buffer;
            self.buffer_mut(buffer).push_u8(crate::opcode::Opcode::LineNo as u8);
            self.buffer_mut(buffer).push_i32(line);
        }
    }

    /// Pushes one lexed command through the compiler. Soft errors are
    /// reported via the diagnostics sink and swallowed; only unrecoverable
    /// problems surface as `Err`.
    pub fn push_command(&mut self, cmd: &Command) -> CompileResult<()> {
        match cmd.kind {
            TokenKind::Comment | TokenKind::ArgSep | TokenKind::CmdSep | TokenKind::End | TokenKind::None => {
                return Ok(());
            }
            TokenKind::GroupBegin => return self.group_begin(cmd),
            TokenKind::GroupEnd => return self.group_end(cmd),
            TokenKind::Value => {}
        }

        if self.is_ignoring() {
            return Ok(());
        }

        let entry = match crate::tables::lookup_command(&cmd.name) {
            Some(entry) => entry,
            None => {
                self.report(cmd.line, cmd.col, format!("unknown command '{}'", cmd.name));
                return Ok(());
            }
        };

        match self.top().kind {
            GroupKind::TrackDef | GroupKind::GroupDef => {
                self.maybe_emit_lineno(cmd.line);
                emit::emit_track_command(self, entry.kind, cmd)
            }
            GroupKind::InstrumentDef => emit::emit_instrument_command(self, entry.kind, cmd),
            GroupKind::WaveformDef => emit::emit_waveform_command(self, entry.kind, cmd),
            GroupKind::SampleDef => emit::emit_sample_command(self, entry.kind, cmd),
        }
        Ok(())
    }

    fn group_begin(&mut self, cmd: &Command) -> CompileResult<()> {
        let level = self.stack.len();

        if self.is_ignoring() {
            self.stack.push(self.top().clone());
            self.top_mut().level = level;
            return Ok(());
        }

        let entry = match crate::tables::lookup_command(&cmd.name) {
            Some(entry) if entry.flags.contains(crate::tables::CommandFlags::OPEN_GROUP) => entry,
            _ => {
                self.report(cmd.line, cmd.col, format!("unknown group '{}', swallowing contents", cmd.name));
                self.ignore_group_level = Some(level);
                let mut frame = self.top().clone();
                frame.level = level;
                self.stack.push(frame);
                return Ok(());
            }
        };

        let parent_track = self.top().track;

        // A group number >= MAX_GROUP (or non-numeric) is rejected and the
        // whole group is silently swallowed, same as an unknown group name.
        if matches!(entry.kind, CommandKind::GroupDef | CommandKind::InstrumentDef | CommandKind::WaveformDef | CommandKind::SampleDef) {
            if let Some(arg) = cmd.arg(0) {
                match arg.parse::<u32>() {
                    Ok(number) if number <= MAX_GROUP => {}
                    _ => {
                        self.report(cmd.line, cmd.col, format!("group number '{}' out of range, swallowing group", arg));
                        self.ignore_group_level = Some(level);
                        let mut frame = self.top().clone();
                        frame.level = level;
                        self.stack.push(frame);
                        return Ok(());
                    }
                }
            }
        }

        let frame = match entry.kind {
            CommandKind::TrackDef => {
                let waveform = cmd.arg(0).and_then(crate::tables::lookup_waveform).unwrap_or(0);
                let slot = cmd.arg(1).and_then(|s| s.parse::<usize>().ok());
                let index = self.tracks.len();
                self.tracks.push(CompilerTrack::new(waveform, slot));
                let track = TrackRef::User(index);
                let buffer = BufferRef::TrackGlobal(track);
                self.buffer_mut(buffer).push_u8(crate::opcode::Opcode::Waveform as u8);
                self.buffer_mut(buffer).push_i16(waveform);
                self.buffer_mut(buffer).push_u8(crate::opcode::Opcode::StepTicks as u8);
                self.buffer_mut(buffer).push_i16(self.step_ticks);
                GroupFrame { level, kind: GroupKind::TrackDef, track, buffer, arpeggio_active: false }
            }
            CommandKind::GroupDef => {
                let number: usize = cmd.arg(0).and_then(|s| s.parse().ok()).unwrap_or(0);
                let buffer = BufferRef::Group(parent_track, number);
                self.buffer_mut(buffer).clear(false);
                GroupFrame { level, kind: GroupKind::GroupDef, track: parent_track, buffer, arpeggio_active: false }
            }
            CommandKind::InstrumentDef => {
                let slot = cmd.arg(0).and_then(|s| s.parse::<usize>().ok());
                let index = self.instruments.insert(slot, Instrument::new());
                self.current_instrument = Some(index);
                GroupFrame {
                    level,
                    kind: GroupKind::InstrumentDef,
                    track: parent_track,
                    buffer: self.top().buffer,
                    arpeggio_active: false,
                }
            }
            CommandKind::WaveformDef => {
                let slot = cmd.arg(0).and_then(|s| s.parse::<usize>().ok());
                let index = self.waveforms.insert(slot, WaveformData::new());
                self.current_waveform = Some(index);
                GroupFrame {
                    level,
                    kind: GroupKind::WaveformDef,
                    track: parent_track,
                    buffer: self.top().buffer,
                    arpeggio_active: false,
                }
            }
            CommandKind::SampleDef => {
                let slot = cmd.arg(0).and_then(|s| s.parse::<usize>().ok());
                let index = self.samples.insert(slot, SampleData::new());
                self.current_sample = Some(index);
                GroupFrame {
                    level,
                    kind: GroupKind::SampleDef,
                    track: parent_track,
                    buffer: self.top().buffer,
                    arpeggio_active: false,
                }
            }
            _ => unreachable!("only group-opening commands reach here"),
        };

        self.stack.push(frame);
        Ok(())
    }

    fn group_end(&mut self, cmd: &Command) -> CompileResult<()> {
        if self.stack.len() <= 1 {
            return Err(CompileError::UnbalancedGroupClose(cmd.line));
        }
        if !self.is_ignoring() {
            self.maybe_emit_lineno(cmd.line);
        }
        let closed_level = self.top().level;
        self.stack.pop();
        if let Some(ignored_level) = self.ignore_group_level {
            if closed_level <= ignored_level {
                self.ignore_group_level = None;
            }
        }
        Ok(())
    }

    /// Links the in-progress compilation and returns the finished tracks.
    /// Fails if any group remains open.
    pub fn terminate(mut self) -> CompileResult<CompiledTracks> {
        if self.stack.len() > 1 {
            return Err(CompileError::UnterminatedGroups(self.stack.len() - 1));
        }
        crate::linker::link(&mut self.global_track)?;
        for track in &mut self.tracks {
            crate::linker::link(track)?;
        }
        Ok(CompiledTracks {
            global_track: self.global_track,
            tracks: self.tracks,
            instruments: self.instruments,
            waveforms: self.waveforms,
            samples: self.samples,
        })
    }

    /// Restores the compiler to its freshly constructed state. With
    /// `keep_data`, tracks are still always fully discarded, but the pools'
    /// backing allocations are retained (their individual entries are
    /// still cleared) for reuse across a subsequent compilation.
    pub fn reset(&mut self, keep_data: bool) {
        self.stack.clear();
        self.tracks.clear();
        self.global_track = CompilerTrack::new(0, None);
        self.instruments.clear(keep_data);
        self.waveforms.clear(keep_data);
        self.samples.clear(keep_data);
        self.current_instrument = None;
        self.current_waveform = None;
        self.current_sample = None;
        self.step_ticks = crate::tables::DEFAULT_STEPTICKS;
        self.last_line = -1;
        self.ignore_group_level = None;
        self.stack.push(GroupFrame {
            level: 0,
            kind: GroupKind::TrackDef,
            track: TrackRef::Global,
            buffer: BufferRef::TrackGlobal(TrackRef::Global),
            arpeggio_active: false,
        });
    }

    pub fn current_instrument_mut(&mut self) -> Option<&mut Instrument> {
        let index = self.current_instrument?;
        self.instruments.get_mut(index)
    }

    pub fn current_waveform_mut(&mut self) -> Option<&mut WaveformData> {
        let index = self.current_waveform?;
        self.waveforms.get_mut(index)
    }

    pub fn current_sample_mut(&mut self) -> Option<&mut SampleData> {
        let index = self.current_sample?;
        self.samples.get_mut(index)
    }

    pub fn load_path(&self) -> &Option<PathBuf> {
        &self.load_path
    }

    pub fn set_load_path(&mut self, path: PathBuf) {
        self.load_path = Some(path);
    }

    pub fn report_diagnostic(&self, line: i32, col: i32, message: impl Into<String>) {
        self.report(line, col, message);
    }
}
