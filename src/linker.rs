//! Two-pass linker (§4.6): resolve group-jumps to absolute calls, append
//! `Return` to each group and `End` to the track's global buffer, then
//! concatenate groups onto the track in slot order.

use byteorder::{ByteOrder, LE};

use crate::bytebuffer::ByteBuffer;
use crate::compiler::CompilerTrack;
use crate::error::{CompileError, CompileResult};
use crate::opcode::Opcode;

/// Rewrites every `GroupJump` in `bytes` into a `Call` with the absolute
/// offset looked up in `offsets`. Walks instruction-by-instruction using
/// the shared opcode-size table so it never misinterprets operand bytes as
/// an opcode.
fn rewrite_group_jumps(bytes: &mut [u8], offsets: &[i32]) -> CompileResult<()> {
    let mut pos = 0;
    while pos < bytes.len() {
        let opcode = Opcode::from_repr(bytes[pos]).expect("corrupt bytecode: unknown opcode byte");
        if opcode == Opcode::Arpeggio {
            let count = bytes[pos + 1] as usize;
            pos += 2 + count * 4;
            continue;
        }
        let operand_size = crate::opcode::fixed_operand_size(opcode).expect("fixed size for non-Arpeggio opcode");
        if opcode == Opcode::GroupJump {
            let group_number = LE::read_i32(&bytes[pos + 1..pos + 5]);
            let offset = offsets
                .get(group_number as usize)
                .copied()
                .filter(|&o| o >= 0)
                .ok_or(CompileError::UndefinedGroupNumber(group_number as u8))?;
            bytes[pos] = Opcode::Call as u8;
            LE::write_i32(&mut bytes[pos + 1..pos + 5], offset);
        }
        pos += 1 + operand_size;
    }
    Ok(())
}

/// Links one track in place: appends `End` to its global buffer, computes
/// group offsets (offset = -1 for an empty/never-defined slot), appends
/// `Return` to each non-empty group, rewrites group-jumps in both the
/// global buffer and every group buffer, then concatenates the groups onto
/// the global buffer in slot order and clears them.
pub fn link(track: &mut CompilerTrack) -> CompileResult<()> {
    track.global_buffer.push_u8(Opcode::End as u8);

    let slot_count = track.group_buffers.len();
    let mut offsets = vec![-1i32; slot_count];
    let mut code_offset = track.global_buffer.size() as i32;
    for slot in 0..slot_count {
        if track.group_buffers.is_vacant(slot) {
            continue;
        }
        offsets[slot] = code_offset;
        let buffer = track.group_buffers.get_mut(slot).expect("checked not vacant");
        buffer.push_u8(Opcode::Return as u8);
        code_offset += buffer.size() as i32;
    }

    rewrite_group_jumps(track.global_buffer.as_mut_slice(), &offsets)?;
    for slot in 0..slot_count {
        if let Some(buffer) = track.group_buffers.get_mut(slot) {
            rewrite_group_jumps(buffer.as_mut_slice(), &offsets)?;
        }
    }

    for slot in 0..slot_count {
        if let Some(buffer) = track.group_buffers.get(slot) {
            track.global_buffer.append_from(buffer);
        }
    }
    track.group_buffers.clear(false);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerTrack;

    fn track_with_group_jump(group: i32) -> CompilerTrack {
        let mut track = CompilerTrack::default();
        track.global_buffer.push_u8(Opcode::GroupJump as u8);
        track.global_buffer.push_i32(group);
        track
    }

    #[test]
    fn resolves_jump_to_defined_group() {
        let mut track = track_with_group_jump(0);
        track.group_buffers.set(0, {
            let mut b = ByteBuffer::new();
            b.push_u8(Opcode::Release as u8);
            b
        });
        link(&mut track).unwrap();
        let bytes = track.global_buffer.as_slice();
        // GroupJump(5 bytes) rewritten to Call, then End(1) -> group 0 starts at offset 6.
        assert_eq!(bytes[0], Opcode::Call as u8);
        let offset = LE::read_i32(&bytes[1..5]);
        assert_eq!(offset, 6);
        assert_eq!(bytes[5], Opcode::End as u8);
        assert_eq!(&bytes[6..], &[Opcode::Release as u8, Opcode::Return as u8]);
    }

    #[test]
    fn undefined_group_is_a_hard_failure() {
        let mut track = track_with_group_jump(4);
        let err = link(&mut track);
        assert!(err.is_err());
    }

    #[test]
    fn every_group_ends_in_return_and_track_ends_in_end() {
        let mut track = CompilerTrack::default();
        track.global_buffer.push_u8(Opcode::Release as u8);
        track.group_buffers.set(0, {
            let mut b = ByteBuffer::new();
            b.push_u8(Opcode::Mute as u8);
            b
        });
        link(&mut track).unwrap();
        let bytes = track.global_buffer.as_slice();
        // Release, End, Mute, Return
        assert_eq!(bytes, &[Opcode::Release as u8, Opcode::End as u8, Opcode::Mute as u8, Opcode::Return as u8]);
    }
}
