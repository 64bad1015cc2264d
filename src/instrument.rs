//! The instrument pool collaborator. Opaque to the compiler beyond the
//! interface below: the synthesis engine is the one that interprets these
//! sequences at playback time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Volume,
    Pitch,
    Panning,
    DutyCycle,
}

/// A flat step sequence: play `values[repeat_begin..]` once, then loop
/// `values[repeat_begin..repeat_begin+repeat_length]` forever.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub values: Vec<i32>,
    pub repeat_begin: usize,
    pub repeat_length: usize,
}

/// One phase of an envelope: hold `value` for `steps` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopePhase {
    pub steps: i32,
    pub value: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub phases: Vec<EnvelopePhase>,
    pub repeat_begin: usize,
    pub repeat_length: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Adsr {
    pub attack: i32,
    pub decay: i32,
    pub sustain: i32,
    pub release: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Instrument {
    pub volume: Option<Sequence>,
    pub pitch: Option<Sequence>,
    pub panning: Option<Sequence>,
    pub duty_cycle: Option<Sequence>,
    pub volume_envelope: Option<Envelope>,
    pub pitch_envelope: Option<Envelope>,
    pub panning_envelope: Option<Envelope>,
    pub duty_cycle_envelope: Option<Envelope>,
    pub adsr: Option<Adsr>,
}

impl Instrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sequence(&mut self, kind: SequenceKind, sequence: Sequence) {
        match kind {
            SequenceKind::Volume => self.volume = Some(sequence),
            SequenceKind::Pitch => self.pitch = Some(sequence),
            SequenceKind::Panning => self.panning = Some(sequence),
            SequenceKind::DutyCycle => self.duty_cycle = Some(sequence),
        }
    }

    pub fn set_envelope(&mut self, kind: SequenceKind, envelope: Envelope) {
        match kind {
            SequenceKind::Volume => self.volume_envelope = Some(envelope),
            SequenceKind::Pitch => self.pitch_envelope = Some(envelope),
            SequenceKind::Panning => self.panning_envelope = Some(envelope),
            SequenceKind::DutyCycle => self.duty_cycle_envelope = Some(envelope),
        }
    }

    pub fn set_adsr(&mut self, adsr: Adsr) {
        self.adsr = Some(adsr);
    }
}

/// Clamps a repeat window so that `begin + length <= total`. The default of
/// 1 for an absent `repeat_length` argument is applied by the caller before
/// this runs; an explicitly-supplied 0 is left as 0.
pub fn clamp_repeat_window(total: usize, repeat_begin: usize, repeat_length: usize) -> (usize, usize) {
    let begin = repeat_begin.min(total.saturating_sub(1));
    let length = repeat_length.min(total.saturating_sub(begin));
    (begin, length)
}
