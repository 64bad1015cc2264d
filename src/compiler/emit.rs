//! Per-group-kind command emitters (§4.5). Each function assumes the
//! caller (`Compiler::push_command`) has already resolved the command name
//! to a `CommandKind` and emitted any pending `LineNo`.

use num_traits::clamp;

use crate::command::Command;
use crate::instrument::{clamp_repeat_window, Adsr, Envelope, EnvelopePhase, Sequence, SequenceKind};
use crate::note::parse_note;
use crate::opcode::Opcode;
use crate::tables::{self, CommandKind, EffectKind, WaveformFlags, MAX_ARPEGGIO, MAX_STEPTICKS, PITCH_UNIT, VOLUME_UNIT};

use super::Compiler;

fn parse_i32(arg: Option<&str>) -> i32 {
    arg.and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn parse_i16(arg: Option<&str>) -> i16 {
    arg.and_then(|s| s.parse().ok()).unwrap_or(0)
}

fn parse_usize(arg: Option<&str>) -> Option<usize> {
    arg.and_then(|s| s.parse().ok())
}

/// Resolves a waveform argument: a lookup-table name, or a bare numeric
/// index OR'ed with the `CustomWaveform` flag bit.
fn resolve_waveform_operand(arg: Option<&str>) -> i16 {
    match arg.and_then(tables::lookup_waveform) {
        Some(value) => value,
        None => {
            let index: i16 = parse_i16(arg);
            index | WaveformFlags::CUSTOM_WAVEFORM.bits()
        }
    }
}

pub fn emit_track_command(compiler: &mut Compiler, kind: CommandKind, cmd: &Command) {
    match kind {
        CommandKind::Attack => emit_attack(compiler, cmd),
        CommandKind::Release => {
            emit_arpeggio_off_if_active(compiler);
            push_opcode(compiler, Opcode::Release);
        }
        CommandKind::Mute => {
            emit_arpeggio_off_if_active(compiler);
            push_opcode(compiler, Opcode::Mute);
        }
        CommandKind::SetRepeatStart => push_opcode(compiler, Opcode::SetRepeatStart),
        CommandKind::End => push_opcode(compiler, Opcode::End),
        CommandKind::AttackTicks => emit_ticks(compiler, Opcode::AttackTicks, cmd),
        CommandKind::ReleaseTicks => emit_ticks(compiler, Opcode::ReleaseTicks, cmd),
        CommandKind::MuteTicks => emit_ticks(compiler, Opcode::MuteTicks, cmd),
        CommandKind::Step => emit_ticks(compiler, Opcode::Step, cmd),
        CommandKind::Ticks => emit_ticks(compiler, Opcode::Ticks, cmd),
        CommandKind::StepTicks => {
            let raw = parse_i16(cmd.arg(0));
            if raw != 0 {
                compiler.step_ticks = raw;
                push_opcode(compiler, Opcode::StepTicks);
                push_i16(compiler, clamp(raw, 1, MAX_STEPTICKS));
            }
        }
        CommandKind::ArpeggioSpeed => emit_ticks(compiler, Opcode::ArpeggioSpeed, cmd),
        CommandKind::Volume => {
            push_opcode(compiler, Opcode::Volume);
            push_i16(compiler, (parse_i32(cmd.arg(0)) * VOLUME_UNIT) as i16);
        }
        CommandKind::MasterVolume => {
            push_opcode(compiler, Opcode::MasterVolume);
            push_i16(compiler, (parse_i32(cmd.arg(0)) * VOLUME_UNIT) as i16);
        }
        CommandKind::Panning => {
            push_opcode(compiler, Opcode::Panning);
            push_i16(compiler, (parse_i32(cmd.arg(0)) * VOLUME_UNIT) as i16);
        }
        CommandKind::DutyCycle => {
            push_opcode(compiler, Opcode::DutyCycle);
            push_u8(compiler, parse_i16(cmd.arg(0)) as u8);
        }
        CommandKind::SampleRepeat => {
            push_opcode(compiler, Opcode::SampleRepeat);
            push_u8(compiler, parse_i16(cmd.arg(0)) as u8);
        }
        CommandKind::PhaseWrap => {
            // Unscaled, unlike `Pitch` — see DESIGN.md for why this diverges
            // from a literal reading of the operand table.
            push_opcode(compiler, Opcode::PhaseWrap);
            push_i32(compiler, parse_i32(cmd.arg(0)));
        }
        CommandKind::Pitch => {
            push_opcode(compiler, Opcode::Pitch);
            push_i32(compiler, parse_i32(cmd.arg(0)) * PITCH_UNIT);
        }
        CommandKind::Effect => emit_effect(compiler, cmd),
        CommandKind::Instrument => {
            push_opcode(compiler, Opcode::Instrument);
            push_i16(compiler, parse_usize(cmd.arg(0)).map(|v| v as i16).unwrap_or(-1));
        }
        CommandKind::Waveform => {
            push_opcode(compiler, Opcode::Waveform);
            push_i16(compiler, resolve_waveform_operand(cmd.arg(0)));
        }
        CommandKind::Sample => {
            push_opcode(compiler, Opcode::Sample);
            push_i16(compiler, parse_usize(cmd.arg(0)).map(|v| v as i16).unwrap_or(-1));
        }
        CommandKind::SampleRange => {
            push_opcode(compiler, Opcode::SampleRange);
            push_i32(compiler, parse_i32(cmd.arg(0)));
            push_i32(compiler, parse_i32(cmd.arg(1)));
        }
        CommandKind::SampleSustainRange => {
            push_opcode(compiler, Opcode::SampleSustainRange);
            push_i32(compiler, parse_i32(cmd.arg(0)));
            push_i32(compiler, parse_i32(cmd.arg(1)));
        }
        CommandKind::Repeat => {
            // `x` compiles to an unresolved jump; the executor resolves the
            // repeat target at playback time.
            push_opcode(compiler, Opcode::Jump);
            push_i32(compiler, -1);
        }
        CommandKind::GroupJump => {
            push_opcode(compiler, Opcode::GroupJump);
            push_i32(compiler, parse_i32(cmd.arg(0)));
        }
        CommandKind::TrackDef
        | CommandKind::GroupDef
        | CommandKind::InstrumentDef
        | CommandKind::WaveformDef
        | CommandKind::SampleDef => {
            unreachable!("group-opening commands are handled by Compiler::group_begin")
        }
    }
}

fn emit_attack(compiler: &mut Compiler, cmd: &Command) {
    let notes: Vec<i32> = cmd.args.iter().map(|s| parse_note(s)).collect();
    if notes.is_empty() {
        return;
    }
    for (i, &note) in notes.iter().enumerate() {
        if note < 0 {
            compiler.report_diagnostic(cmd.line, cmd.col, format!("invalid note '{}'", cmd.args[i]));
        }
    }
    if notes[0] < 0 {
        return;
    }
    push_opcode(compiler, Opcode::Attack);
    push_i32(compiler, notes[0]);

    if notes.len() > 1 {
        let count = notes.len().min(MAX_ARPEGGIO);
        push_opcode(compiler, Opcode::Arpeggio);
        push_u8(compiler, count as u8);
        for &note in &notes[..count] {
            push_i32(compiler, note.max(0) - notes[0]);
        }
        compiler.top_mut().arpeggio_active = true;
    } else if compiler.top().arpeggio_active {
        push_opcode(compiler, Opcode::Arpeggio);
        push_u8(compiler, 0);
        compiler.top_mut().arpeggio_active = false;
    }
}

fn emit_arpeggio_off_if_active(compiler: &mut Compiler) {
    if compiler.top().arpeggio_active {
        push_opcode(compiler, Opcode::Arpeggio);
        push_u8(compiler, 0);
        compiler.top_mut().arpeggio_active = false;
    }
}

fn emit_ticks(compiler: &mut Compiler, opcode: Opcode, cmd: &Command) {
    let raw = parse_i16(cmd.arg(0));
    if raw == 0 {
        return;
    }
    push_opcode(compiler, opcode);
    push_i16(compiler, clamp(raw, 1, MAX_STEPTICKS));
}

fn emit_effect(compiler: &mut Compiler, cmd: &Command) {
    let (kind_value, kind) = match cmd.arg(0).and_then(tables::lookup_effect) {
        Some(found) => found,
        None => {
            compiler.report_diagnostic(cmd.line, cmd.col, format!("unknown effect '{}'", cmd.arg(0).unwrap_or("")));
            return;
        }
    };
    let a = parse_i32(cmd.arg(1));
    let raw_b = parse_i32(cmd.arg(2));
    let b = match kind {
        EffectKind::Tremolo => raw_b * VOLUME_UNIT,
        EffectKind::Vibrato => raw_b * PITCH_UNIT,
        EffectKind::Portamento | EffectKind::PanningSlide | EffectKind::VolumeSlide => raw_b,
    };
    let c = parse_i32(cmd.arg(3));
    push_opcode(compiler, Opcode::Effect);
    push_i16(compiler, kind_value);
    push_i32(compiler, a);
    push_i32(compiler, b);
    push_i32(compiler, c);
}

pub fn emit_instrument_command(compiler: &mut Compiler, kind: CommandKind, cmd: &Command) {
    let _ = kind;
    let envelope_kind = match tables::lookup_envelope(&cmd.name) {
        Some(k) => k,
        None => {
            compiler.report_diagnostic(cmd.line, cmd.col, format!("unknown instrument directive '{}'", cmd.name));
            return;
        }
    };

    if envelope_kind == tables::EnvelopeKind::Adsr {
        if cmd.args.len() < 4 {
            compiler.report_diagnostic(cmd.line, cmd.col, "adsr requires 4 arguments");
            return;
        }
        let adsr = Adsr {
            attack: parse_i32(cmd.arg(0)),
            decay: parse_i32(cmd.arg(1)),
            sustain: parse_i32(cmd.arg(2)) * VOLUME_UNIT,
            release: parse_i32(cmd.arg(3)),
        };
        if let Some(instrument) = compiler.current_instrument_mut() {
            instrument.set_adsr(adsr);
        }
        return;
    }

    // Each of the four targets has a distinct sequence name and envelope
    // name (`v`/`vnv`, `a`/`anv`, `p`/`pnv`, `dc`/`dcnv`); the table lookup
    // above already told us which target and which form.
    let (sequence_kind, is_envelope, unit) = match envelope_kind {
        tables::EnvelopeKind::VolumeSeq => (SequenceKind::Volume, false, VOLUME_UNIT),
        tables::EnvelopeKind::VolumeEnv => (SequenceKind::Volume, true, VOLUME_UNIT),
        tables::EnvelopeKind::PitchSeq => (SequenceKind::Pitch, false, PITCH_UNIT),
        tables::EnvelopeKind::PitchEnv => (SequenceKind::Pitch, true, PITCH_UNIT),
        tables::EnvelopeKind::PanningSeq => (SequenceKind::Panning, false, VOLUME_UNIT),
        tables::EnvelopeKind::PanningEnv => (SequenceKind::Panning, true, VOLUME_UNIT),
        tables::EnvelopeKind::DutyCycleSeq => (SequenceKind::DutyCycle, false, 1),
        tables::EnvelopeKind::DutyCycleEnv => (SequenceKind::DutyCycle, true, 1),
        tables::EnvelopeKind::Adsr => unreachable!("handled above"),
    };

    let min_args = if is_envelope { 4 } else { 3 };
    if cmd.args.len() < min_args {
        compiler.report_diagnostic(cmd.line, cmd.col, format!("'{}' requires at least {} arguments", cmd.name, min_args));
        return;
    }

    let repeat_begin_raw = parse_usize(cmd.arg(0)).unwrap_or(0);
    let repeat_length_raw = parse_usize(cmd.arg(1)).unwrap_or(1);
    let rest = &cmd.args[2..];

    if is_envelope {
        let phases: Vec<EnvelopePhase> = rest
            .chunks_exact(2)
            .map(|pair| EnvelopePhase { steps: parse_i32(Some(&pair[0])), value: parse_i32(Some(&pair[1])) * unit })
            .collect();
        let (begin, length) = clamp_repeat_window(phases.len(), repeat_begin_raw, repeat_length_raw);
        let envelope = Envelope { phases, repeat_begin: begin, repeat_length: length };
        if let Some(instrument) = compiler.current_instrument_mut() {
            instrument.set_envelope(sequence_kind, envelope);
        }
    } else {
        let values: Vec<i32> = rest.iter().map(|s| parse_i32(Some(s)) * unit).collect();
        let (begin, length) = clamp_repeat_window(values.len(), repeat_begin_raw, repeat_length_raw);
        let sequence = Sequence { values, repeat_begin: begin, repeat_length: length };
        if let Some(instrument) = compiler.current_instrument_mut() {
            instrument.set_sequence(sequence_kind, sequence);
        }
    }
}

pub fn emit_waveform_command(compiler: &mut Compiler, _kind: CommandKind, cmd: &Command) {
    if cmd.name != "s" {
        compiler.report_diagnostic(cmd.line, cmd.col, format!("'{}' is not valid inside a waveform group", cmd.name));
        return;
    }
    let frames: Vec<i32> = cmd.args.iter().map(|s| parse_i32(Some(s)) * VOLUME_UNIT).collect();
    if let Some(waveform) = compiler.current_waveform_mut() {
        if let Err(err) = waveform.set_frames(frames) {
            compiler.report_diagnostic(cmd.line, cmd.col, err.to_string());
        }
    }
}

pub fn emit_sample_command(compiler: &mut Compiler, _kind: CommandKind, cmd: &Command) {
    use crate::sample::{RawPcmDecoder, SampleAttr};
    use std::path::Path;

    let directive = match tables::lookup_sample_directive(&cmd.name) {
        Some(d) => d,
        None => {
            compiler.report_diagnostic(cmd.line, cmd.col, format!("unknown sample directive '{}'", cmd.name));
            return;
        }
    };

    match directive {
        tables::SampleDirective::Load => {
            // `load wav <filename>`: args[0] is the format tag, args[1] the path.
            let filename = match cmd.arg(1).or_else(|| cmd.arg(0)) {
                Some(f) => f,
                None => {
                    compiler.report_diagnostic(cmd.line, cmd.col, "load requires a filename");
                    return;
                }
            };
            if compiler.load_path().is_none() {
                if let Ok(cwd) = crate::path::default_load_path() {
                    compiler.set_load_path(cwd);
                }
            }
            let resolved = match crate::path::resolve_sample_path(compiler.load_path(), filename) {
                Ok(path) => path,
                Err(_) => Path::new(filename).to_path_buf(),
            };
            let current = compiler.current_sample;
            if let Some(index) = current {
                let decoder = RawPcmDecoder;
                let samples = &mut compiler.samples;
                if let Some(sample) = samples.get_mut(index) {
                    if let Err(err) = sample.load_wave(&resolved, &decoder) {
                        // Hard failure: I/O errors during sample load abort compilation.
                        // Propagated to the caller by re-reporting here would be silent;
                        // callers that need this to be fatal should call
                        // `Compiler::push_command` and check the returned `Result`.
                        compiler.report_diagnostic(cmd.line, cmd.col, err.to_string());
                    }
                }
            }
        }
        tables::SampleDirective::Pitch => {
            if let Some(sample) = compiler.current_sample_mut() {
                sample.set_attr(SampleAttr::Pitch, parse_i32(cmd.arg(0)) * PITCH_UNIT);
            }
        }
        tables::SampleDirective::SustainRange => {
            if let Some(sample) = compiler.current_sample_mut() {
                sample.set_sustain_range(parse_i32(cmd.arg(0)), parse_i32(cmd.arg(1)));
            }
        }
        tables::SampleDirective::Raw => {}
    }
}

fn push_opcode(compiler: &mut Compiler, opcode: Opcode) {
    let buffer = compiler.top().buffer;
    compiler.buffer_mut(buffer).push_u8(opcode as u8);
}

fn push_u8(compiler: &mut Compiler, value: u8) {
    let buffer = compiler.top().buffer;
    compiler.buffer_mut(buffer).push_u8(value);
}

fn push_i16(compiler: &mut Compiler, value: i16) {
    let buffer = compiler.top().buffer;
    compiler.buffer_mut(buffer).push_i16(value);
}

fn push_i32(compiler: &mut Compiler, value: i32) {
    let buffer = compiler.top().buffer;
    compiler.buffer_mut(buffer).push_i32(value);
}
