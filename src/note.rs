use num_traits::clamp;

use crate::tables::{self, FINT20_UNIT, NOTE_MAX, NOTE_MIN, PITCH_UNIT};

/// Parses a note string of the form `<letter>[#]<octave>[<signed-cents>]`,
/// e.g. `c4`, `a#3`, `c4+12`. Returns the fixed-point pitch value, or -1 if
/// the leading letters do not name a known note.
pub fn parse_note(text: &str) -> i32 {
    let bytes = text.as_bytes();
    let mut i = 0;

    // Leading letter, optionally followed by '#'.
    if i >= bytes.len() || !bytes[i].is_ascii_alphabetic() {
        return -1;
    }
    i += 1;
    if i < bytes.len() && bytes[i] == b'#' {
        i += 1;
    }
    let letters = &text[..i];

    let semitone = match tables::lookup_note(&letters.to_ascii_lowercase()) {
        Some(value) => value,
        None => return -1,
    };

    // Octave: one or more digits.
    let octave_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let octave: i32 = if i > octave_start { text[octave_start..i].parse().unwrap_or(0) } else { 0 };

    // Optional signed cents suffix, e.g. `+12` or `-50`.
    let cents: i32 = if i < bytes.len() { text[i..].parse().unwrap_or(0) } else { 0 };

    let note = clamp(octave * 12 + semitone, NOTE_MIN, NOTE_MAX);
    note * FINT20_UNIT + cents * PITCH_UNIT
}
