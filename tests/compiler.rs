use blipcomp::command::{Command, TokenKind};
use blipcomp::diagnostics::StderrDiagnostics;
use blipcomp::note::parse_note;
use blipcomp::opcode::{fixed_operand_size, Opcode};
use blipcomp::tables::{FINT20_UNIT, VOLUME_UNIT};
use blipcomp::Compiler;

fn cmd(kind: TokenKind, name: &str, args: &[&str], line: i32) -> Command {
    Command::new(kind, name, args.iter().map(|s| s.to_string()).collect(), line, 1)
}

fn value(name: &str, args: &[&str], line: i32) -> Command {
    cmd(TokenKind::Value, name, args, line)
}

fn group_begin(name: &str, args: &[&str], line: i32) -> Command {
    cmd(TokenKind::GroupBegin, name, args, line)
}

fn group_end(line: i32) -> Command {
    cmd(TokenKind::GroupEnd, "", &[], line)
}

fn new_compiler() -> Compiler {
    Compiler::new(Box::new(StderrDiagnostics))
}

/// Decodes a linked instruction stream into `(opcode, operand_bytes)`
/// pairs, the same walk the executor and the linker both perform.
fn decode(bytes: &[u8]) -> Vec<(Opcode, Vec<u8>)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let opcode = Opcode::from_repr(bytes[pos]).expect("valid opcode");
        let size = if opcode == Opcode::Arpeggio {
            let count = bytes[pos + 1] as usize;
            1 + count * 4
        } else {
            fixed_operand_size(opcode).unwrap()
        };
        out.push((opcode, bytes[pos + 1..pos + 1 + size].to_vec()));
        pos += 1 + size;
    }
    out
}

fn i32_at(bytes: &[u8]) -> i32 {
    i32::from_le_bytes(bytes.try_into().unwrap())
}

fn i16_at(bytes: &[u8]) -> i16 {
    i16::from_le_bytes(bytes.try_into().unwrap())
}

#[test]
fn single_tone_track_compiles_to_expected_bytecode() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&value("v", &["192"], 1)).unwrap();
    compiler.push_command(&value("st", &["6"], 1)).unwrap();
    compiler.push_command(&value("a", &["c4"], 1)).unwrap();
    compiler.push_command(&value("s", &["4"], 1)).unwrap();
    compiler.push_command(&value("r", &[], 1)).unwrap();
    compiler.push_command(&value("s", &["4"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();

    let compiled = compiler.terminate().unwrap();
    assert_eq!(compiled.tracks.len(), 1);

    let decoded = decode(compiled.tracks[0].global_buffer.as_slice());
    let kinds: Vec<Opcode> = decoded.iter().map(|(op, _)| *op).collect();
    assert_eq!(
        kinds,
        vec![
            Opcode::Waveform,
            Opcode::StepTicks,
            Opcode::LineNo,
            Opcode::Volume,
            Opcode::StepTicks,
            Opcode::Attack,
            Opcode::Step,
            Opcode::Release,
            Opcode::Step,
            Opcode::End,
        ]
    );
    assert_eq!(i16_at(&decoded[3].1), (192 * VOLUME_UNIT) as i16);
    assert_eq!(i16_at(&decoded[4].1), 6);
    assert_eq!(i32_at(&decoded[5].1), 48 * FINT20_UNIT);
}

#[test]
fn arpeggio_then_plain_attack_emits_arpeggio_off() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&value("a", &["c4", "e4", "g4"], 1)).unwrap();
    compiler.push_command(&value("a", &["c4"], 2)).unwrap();
    compiler.push_command(&group_end(2)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let decoded = decode(compiled.tracks[0].global_buffer.as_slice());
    let kinds: Vec<Opcode> = decoded.iter().map(|(op, _)| *op).collect();
    assert_eq!(
        kinds,
        vec![
            Opcode::Waveform,
            Opcode::StepTicks,
            Opcode::LineNo,
            Opcode::Attack,
            Opcode::Arpeggio,
            Opcode::LineNo,
            Opcode::Attack,
            Opcode::Arpeggio,
            Opcode::End,
        ]
    );
    // first arpeggio carries 3 deltas, the first of which is always 0
    assert_eq!(decoded[4].1[0], 3);
    assert_eq!(i32_at(&decoded[4].1[1..5]), 0);
    assert_eq!(i32_at(&decoded[4].1[5..9]), parse_note("e4") - parse_note("c4"));
    assert_eq!(i32_at(&decoded[4].1[9..13]), parse_note("g4") - parse_note("c4"));
    // second arpeggio is the explicit "off" (count 0)
    assert_eq!(decoded[7].1[0], 0);
}

#[test]
fn invalid_leading_note_suppresses_attack_entirely() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&value("a", &["zzz"], 1)).unwrap();
    compiler.push_command(&value("v", &["1"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let decoded = decode(compiled.tracks[0].global_buffer.as_slice());
    assert!(decoded.iter().all(|(op, _)| *op != Opcode::Attack && *op != Opcode::Arpeggio));
}

#[test]
fn group_jump_resolves_to_call_and_group_ends_in_return() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&group_begin("grp", &["0"], 1)).unwrap();
    compiler.push_command(&value("v", &["128"], 1)).unwrap();
    compiler.push_command(&value("s", &["4"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();
    compiler.push_command(&value("g", &["0"], 2)).unwrap();
    compiler.push_command(&group_end(2)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let bytes = compiled.tracks[0].global_buffer.as_slice();
    let decoded = decode(bytes);
    let call = decoded.iter().find(|(op, _)| *op == Opcode::Call).expect("GroupJump must resolve to Call");
    let offset = i32_at(&call.1) as usize;
    assert!(offset < bytes.len());
    // Group 0 is the only (and therefore last) group appended.
    assert_eq!(bytes[bytes.len() - 1], Opcode::Return as u8);
}

#[test]
fn unterminated_group_is_a_hard_failure() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    let err = compiler.terminate();
    assert!(err.is_err());
}

#[test]
fn unknown_group_is_swallowed_but_siblings_still_compile() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("foo", &["1"], 1)).unwrap();
    compiler.push_command(&value("a", &["c4"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();
    compiler.push_command(&value("v", &["128"], 1)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let decoded = decode(compiled.global_track.global_buffer.as_slice());
    // Nothing from inside `foo` made it into any track; `v:128` landed on
    // the global track since no `track` group was ever opened.
    assert!(decoded.iter().any(|(op, _)| *op == Opcode::Volume));
    assert!(decoded.iter().all(|(op, _)| *op != Opcode::Attack));
}

#[test]
fn instrument_sequence_and_envelope_directives_reach_the_pool() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("instr", &["0"], 1)).unwrap();
    // `v` is the volume step-sequence (>=3 args): repeat-begin, repeat-length, values...
    compiler.push_command(&value("v", &["0", "1", "10", "20", "30"], 1)).unwrap();
    // `anv` is the pitch *envelope* (>=4 args, taken in (steps, value) pairs).
    compiler.push_command(&value("anv", &["0", "1", "4", "100", "8", "-50"], 1)).unwrap();
    compiler.push_command(&value("adsr", &["1", "2", "200", "3"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let instrument = compiled.instruments.get(0).expect("instrument 0 was declared");

    let volume = instrument.volume.as_ref().expect("volume sequence was set");
    assert_eq!(volume.values, vec![10 * VOLUME_UNIT, 20 * VOLUME_UNIT, 30 * VOLUME_UNIT]);

    // Pitch is a distinct slot from Volume; its envelope must not be dropped
    // on the floor by a match arm that only knows about the other three.
    let pitch_envelope = instrument.pitch_envelope.as_ref().expect("pitch envelope was set, not discarded");
    assert_eq!(pitch_envelope.phases.len(), 2);
    assert_eq!(pitch_envelope.phases[0].steps, 4);
    assert_eq!(pitch_envelope.phases[0].value, 100 * blipcomp::tables::PITCH_UNIT);
    assert_eq!(pitch_envelope.phases[1].value, -50 * blipcomp::tables::PITCH_UNIT);
    assert!(instrument.pitch.is_none(), "the sequence slot stays empty when only the envelope form was used");

    let adsr = instrument.adsr.expect("adsr was set");
    assert_eq!(adsr.sustain, 200 * VOLUME_UNIT);
}

#[test]
fn instrument_def_does_not_leak_lineno_into_enclosing_track() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&value("v", &["1"], 1)).unwrap();
    compiler.push_command(&group_begin("instr", &["0"], 2)).unwrap();
    compiler.push_command(&value("v", &["0", "1", "10"], 3)).unwrap();
    compiler.push_command(&group_end(3)).unwrap();
    compiler.push_command(&value("v", &["2"], 4)).unwrap();
    compiler.push_command(&group_end(4)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let decoded = decode(compiled.tracks[0].global_buffer.as_slice());
    let kinds: Vec<Opcode> = decoded.iter().map(|(op, _)| *op).collect();
    // Only the track's own two `v` commands cause a line change (lines 1
    // and 4); the instrument group's internal line 3 never touches this
    // buffer at all.
    assert_eq!(kinds.iter().filter(|op| **op == Opcode::LineNo).count(), 2);
}

#[test]
fn explicit_end_command_emits_mid_buffer_end_opcode() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&value("r", &[], 1)).unwrap();
    compiler.push_command(&value("z", &[], 1)).unwrap();
    compiler.push_command(&value("v", &["1"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let decoded = decode(compiled.tracks[0].global_buffer.as_slice());
    let kinds: Vec<Opcode> = decoded.iter().map(|(op, _)| *op).collect();
    // The user's `z` produces its own End, distinct from the linker's
    // trailing End appended at the very end of the buffer.
    assert_eq!(kinds.iter().filter(|op| **op == Opcode::End).count(), 2);
    assert_eq!(kinds[kinds.len() - 1], Opcode::End);
}

#[test]
fn second_group_definition_overwrites_the_first() {
    let mut compiler = new_compiler();
    compiler.push_command(&group_begin("track", &["square"], 1)).unwrap();
    compiler.push_command(&group_begin("grp", &["3"], 1)).unwrap();
    compiler.push_command(&value("v", &["1"], 1)).unwrap();
    compiler.push_command(&group_end(1)).unwrap();
    compiler.push_command(&group_begin("grp", &["3"], 2)).unwrap();
    compiler.push_command(&value("v", &["2"], 2)).unwrap();
    compiler.push_command(&group_end(2)).unwrap();
    compiler.push_command(&value("g", &["3"], 3)).unwrap();
    compiler.push_command(&group_end(3)).unwrap();

    let compiled = compiler.terminate().unwrap();
    let bytes = compiled.tracks[0].global_buffer.as_slice();
    let decoded = decode(bytes);
    let call = decoded.iter().find(|(op, _)| *op == Opcode::Call).unwrap();
    let offset = i32_at(&call.1) as usize;
    let group_decoded = decode(&bytes[offset..]);
    // Only the second `v` (scaled value 2) survives; the first was discarded.
    let (_, volume_operand) = group_decoded.iter().find(|(op, _)| *op == Opcode::Volume).unwrap();
    assert_eq!(i16_at(volume_operand), (2 * VOLUME_UNIT) as i16);
}
