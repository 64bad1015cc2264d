//! The bytecode instruction set. Every instruction is one opcode byte
//! followed by zero or more fixed-width little-endian operands; the
//! emitter, the linker, and (by contract) the executor must all agree on
//! operand sizes, since the linker walks unannotated bytes and must know
//! each instruction's length without parsing it semantically.

/// Fixed operand layout for a single opcode, consulted by the linker's
/// byte-stream walker. `Arpeggio`'s size is variable (`1 + 4*n` bytes) and
/// is handled specially by the walker rather than through this table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum Opcode {
    Attack = 0,
    Arpeggio = 1,
    Release = 2,
    Mute = 3,
    SetRepeatStart = 4,
    End = 5,
    Return = 6,
    AttackTicks = 7,
    ReleaseTicks = 8,
    MuteTicks = 9,
    Step = 10,
    Ticks = 11,
    StepTicks = 12,
    ArpeggioSpeed = 13,
    Volume = 14,
    MasterVolume = 15,
    Panning = 16,
    DutyCycle = 17,
    SampleRepeat = 18,
    PhaseWrap = 19,
    Pitch = 20,
    Effect = 21,
    Instrument = 22,
    Waveform = 23,
    Sample = 24,
    SampleRange = 25,
    SampleSustainRange = 26,
    GroupJump = 27,
    Call = 28,
    Jump = 29,
    LineNo = 30,
}

/// The width, in bytes, of every *fixed*-size opcode's operand block
/// (excluding the opcode byte itself). `Arpeggio` is handled outside this
/// table by the walker because its size depends on its leading count byte.
///
/// `MuteTicks` is sized identically to `AttackTicks`/`ReleaseTicks` (both
/// i16 tick counts) — the three belong to the same family in the operand
/// table in §4.5 of the specification.
pub fn fixed_operand_size(opcode: Opcode) -> Option<usize> {
    use Opcode::*;
    Some(match opcode {
        Attack => 4,
        Arpeggio => return None,
        Release | Mute | SetRepeatStart | End | Return => 0,
        AttackTicks | ReleaseTicks | MuteTicks | Step | Ticks | StepTicks | ArpeggioSpeed => 2,
        Volume | MasterVolume | Panning => 2,
        DutyCycle | SampleRepeat => 1,
        PhaseWrap | Pitch => 4,
        Effect => 2 + 4 + 4 + 4,
        Instrument | Waveform | Sample => 2,
        SampleRange | SampleSustainRange => 4 + 4,
        GroupJump => 4,
        Call => 4,
        Jump => 4,
        LineNo => 4,
    })
}

/// Total instruction size in bytes (opcode byte + operands), given the
/// buffer positioned just past the opcode byte so `Arpeggio`'s count
/// prefix can be read.
pub fn instruction_size(opcode: Opcode, arpeggio_count: Option<u8>) -> usize {
    match fixed_operand_size(opcode) {
        Some(operand_size) => 1 + operand_size,
        None => {
            let count = arpeggio_count.expect("Arpeggio instruction requires its count byte") as usize;
            1 + 1 + count * 4
        }
    }
}
