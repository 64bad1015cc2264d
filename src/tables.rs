//! Static sorted lookup tables and the fixed-point constants they feed.
//!
//! Every table here is a compile-time sorted array of `(name, value, flags)`
//! searched with `binary_search_by`. Keeping them sorted by name is a
//! maintenance invariant, not something computed at runtime; `tables_are_sorted`
//! below guards it the same way a debug assertion would at startup.

use bitflags::bitflags;

/// Maximum volume the fixed-point volume domain can represent. `v:192`
/// (0..255 input range) must scale to `49344` — see the worked example in
/// the single-tone scenario test.
pub const MAX_VOLUME: i32 = 65535;
pub const VOLUME_UNIT: i32 = MAX_VOLUME / 255;

/// 20-bit fixed-point shift for pitch/note values: `c4` (semitone 48) must
/// scale to `48 << 20`.
pub const FINT20_SHIFT: u32 = 20;
pub const FINT20_UNIT: i32 = 1 << FINT20_SHIFT;
pub const PITCH_UNIT: i32 = FINT20_UNIT / 100;

pub const NOTE_MIN: i32 = 0;
pub const NOTE_MAX: i32 = 119;

pub const MAX_STEPTICKS: i16 = 240;
pub const MAX_ARPEGGIO: usize = 32;
pub const MAX_GROUP: u32 = 255;
pub const MAX_SEQ_LENGTH: usize = 256;
pub const MAX_WAVEFORM_LENGTH: usize = 64;
pub const DEFAULT_STEPTICKS: i16 = 24;

bitflags! {
    /// Behavioral flags attached to a command-table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// This command opens a new nested group (track/instr/samp/wave/grp).
        const OPEN_GROUP = 0b0000_0001;
    }
}

bitflags! {
    /// High bit OR'ed into a numeric waveform operand to distinguish a
    /// custom-waveform pool index from a built-in waveform kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WaveformFlags: i16 {
        const CUSTOM_WAVEFORM = 0b0100_0000_0000_0000;
    }
}

/// Kinds of track-context command, looked up by name in [`COMMANDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum CommandKind {
    Attack,
    Release,
    Mute,
    AttackTicks,
    ReleaseTicks,
    MuteTicks,
    Step,
    Ticks,
    StepTicks,
    ArpeggioSpeed,
    Volume,
    MasterVolume,
    Panning,
    DutyCycle,
    SampleRepeat,
    PhaseWrap,
    Pitch,
    Effect,
    Instrument,
    Waveform,
    Sample,
    SampleRange,
    SampleSustainRange,
    Repeat,
    SetRepeatStart,
    End,
    GroupJump,
    TrackDef,
    GroupDef,
    InstrumentDef,
    WaveformDef,
    SampleDef,
}

pub struct CommandEntry {
    pub name: &'static str,
    pub kind: CommandKind,
    pub flags: CommandFlags,
}

/// Sorted by `name`. Group-opening commands (`track`, `grp`, `instr`,
/// `samp`, `wave`) carry `OPEN_GROUP`.
pub static COMMANDS: &[CommandEntry] = &[
    CommandEntry { name: "a", kind: CommandKind::Attack, flags: CommandFlags::empty() },
    CommandEntry { name: "arp", kind: CommandKind::ArpeggioSpeed, flags: CommandFlags::empty() },
    CommandEntry { name: "atk", kind: CommandKind::AttackTicks, flags: CommandFlags::empty() },
    CommandEntry { name: "duty", kind: CommandKind::DutyCycle, flags: CommandFlags::empty() },
    CommandEntry { name: "fx", kind: CommandKind::Effect, flags: CommandFlags::empty() },
    CommandEntry { name: "g", kind: CommandKind::GroupJump, flags: CommandFlags::empty() },
    CommandEntry { name: "grp", kind: CommandKind::GroupDef, flags: CommandFlags::OPEN_GROUP },
    CommandEntry { name: "i", kind: CommandKind::Instrument, flags: CommandFlags::empty() },
    CommandEntry { name: "instr", kind: CommandKind::InstrumentDef, flags: CommandFlags::OPEN_GROUP },
    CommandEntry { name: "m", kind: CommandKind::Mute, flags: CommandFlags::empty() },
    CommandEntry { name: "mt", kind: CommandKind::MuteTicks, flags: CommandFlags::empty() },
    CommandEntry { name: "mvol", kind: CommandKind::MasterVolume, flags: CommandFlags::empty() },
    CommandEntry { name: "p", kind: CommandKind::Pitch, flags: CommandFlags::empty() },
    CommandEntry { name: "pan", kind: CommandKind::Panning, flags: CommandFlags::empty() },
    CommandEntry { name: "pw", kind: CommandKind::PhaseWrap, flags: CommandFlags::empty() },
    CommandEntry { name: "r", kind: CommandKind::Release, flags: CommandFlags::empty() },
    CommandEntry { name: "rel", kind: CommandKind::ReleaseTicks, flags: CommandFlags::empty() },
    CommandEntry { name: "rs", kind: CommandKind::SetRepeatStart, flags: CommandFlags::empty() },
    CommandEntry { name: "s", kind: CommandKind::Step, flags: CommandFlags::empty() },
    CommandEntry { name: "samp", kind: CommandKind::SampleDef, flags: CommandFlags::OPEN_GROUP },
    CommandEntry { name: "smp", kind: CommandKind::Sample, flags: CommandFlags::empty() },
    CommandEntry { name: "srep", kind: CommandKind::SampleRepeat, flags: CommandFlags::empty() },
    CommandEntry { name: "srng", kind: CommandKind::SampleRange, flags: CommandFlags::empty() },
    CommandEntry { name: "ssrng", kind: CommandKind::SampleSustainRange, flags: CommandFlags::empty() },
    CommandEntry { name: "st", kind: CommandKind::StepTicks, flags: CommandFlags::empty() },
    CommandEntry { name: "t", kind: CommandKind::Ticks, flags: CommandFlags::empty() },
    CommandEntry { name: "track", kind: CommandKind::TrackDef, flags: CommandFlags::OPEN_GROUP },
    CommandEntry { name: "v", kind: CommandKind::Volume, flags: CommandFlags::empty() },
    CommandEntry { name: "w", kind: CommandKind::Waveform, flags: CommandFlags::empty() },
    CommandEntry { name: "wave", kind: CommandKind::WaveformDef, flags: CommandFlags::OPEN_GROUP },
    CommandEntry { name: "x", kind: CommandKind::Repeat, flags: CommandFlags::empty() },
    CommandEntry { name: "z", kind: CommandKind::End, flags: CommandFlags::empty() },
];

pub fn lookup_command(name: &str) -> Option<&'static CommandEntry> {
    COMMANDS.binary_search_by(|entry| entry.name.cmp(name)).ok().map(|i| &COMMANDS[i])
}

/// Sorted note-letter table; semitone index within an octave (0..11).
/// `b` and `h` both map to 11 (German vs. English note-naming convention).
pub static NOTES: &[(&str, i32)] = &[
    ("a", 9),
    ("a#", 10),
    ("b", 11),
    ("c", 0),
    ("c#", 1),
    ("d", 2),
    ("d#", 3),
    ("e", 4),
    ("f", 5),
    ("f#", 6),
    ("g", 7),
    ("g#", 8),
    ("h", 11),
];

pub fn lookup_note(letters: &str) -> Option<i32> {
    NOTES.binary_search_by(|(name, _)| name.cmp(&letters)).ok().map(|i| NOTES[i].1)
}

/// Built-in waveform kinds, looked up by name when a `wave:<name>` or
/// `w:<name>` argument is not a bare numeric index.
pub static WAVEFORMS: &[(&str, i16)] = &[
    ("noise", 3),
    ("sample", 5),
    ("sawtooth", 2),
    ("sine", 4),
    ("square", 0),
    ("triangle", 1),
];

pub fn lookup_waveform(name: &str) -> Option<i16> {
    WAVEFORMS.binary_search_by(|(n, _)| n.cmp(&name)).ok().map(|i| WAVEFORMS[i].1)
}

/// Effect kinds for the `fx` command; determines which of its `b` operand
/// scaling rules (volume-unit for tremolo, pitch-unit for vibrato, none for
/// the remaining three) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Portamento,
    PanningSlide,
    Tremolo,
    Vibrato,
    VolumeSlide,
}

pub static EFFECTS: &[(&str, i16, EffectKind)] = &[
    ("panslide", 1, EffectKind::PanningSlide),
    ("portamento", 0, EffectKind::Portamento),
    ("tremolo", 2, EffectKind::Tremolo),
    ("vibrato", 3, EffectKind::Vibrato),
    ("volslide", 4, EffectKind::VolumeSlide),
];

pub fn lookup_effect(name: &str) -> Option<(i16, EffectKind)> {
    EFFECTS.binary_search_by(|(n, _, _)| n.cmp(&name)).ok().map(|i| (EFFECTS[i].1, EFFECTS[i].2))
}

/// Sequence/envelope directives inside an `instr` group. Each of the four
/// targets (Volume, Pitch, Panning, DutyCycle) has one step-sequence name
/// and one envelope name, plus the standalone `adsr` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    VolumeSeq,
    PitchSeq,
    PanningSeq,
    DutyCycleSeq,
    Adsr,
    VolumeEnv,
    PitchEnv,
    PanningEnv,
    DutyCycleEnv,
}

pub static ENVELOPES: &[(&str, EnvelopeKind)] = &[
    ("a", EnvelopeKind::PitchSeq),
    ("adsr", EnvelopeKind::Adsr),
    ("anv", EnvelopeKind::PitchEnv),
    ("dc", EnvelopeKind::DutyCycleSeq),
    ("dcnv", EnvelopeKind::DutyCycleEnv),
    ("p", EnvelopeKind::PanningSeq),
    ("pnv", EnvelopeKind::PanningEnv),
    ("v", EnvelopeKind::VolumeSeq),
    ("vnv", EnvelopeKind::VolumeEnv),
];

pub fn lookup_envelope(name: &str) -> Option<EnvelopeKind> {
    ENVELOPES.binary_search_by(|(n, _)| n.cmp(&name)).ok().map(|i| ENVELOPES[i].1)
}

/// Miscellaneous directives inside a `samp` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDirective {
    Load,
    Pitch,
    SustainRange,
    Raw,
}

pub static SAMPLE_DIRECTIVES: &[(&str, SampleDirective)] = &[
    ("ds", SampleDirective::SustainRange),
    ("load", SampleDirective::Load),
    ("pt", SampleDirective::Pitch),
    ("raw", SampleDirective::Raw),
];

pub fn lookup_sample_directive(name: &str) -> Option<SampleDirective> {
    SAMPLE_DIRECTIVES.binary_search_by(|(n, _)| n.cmp(&name)).ok().map(|i| SAMPLE_DIRECTIVES[i].1)
}
