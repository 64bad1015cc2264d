//! A chiptune-style music compiler: front end, linker, and bytecode
//! instruction set. Synthesis, sample decoding, and any command-line
//! driver live outside this crate (see `sample::WaveDecoder` for the one
//! pluggable seam the sample loader leaves to its host).

pub mod bytebuffer;
pub mod command;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod instrument;
pub mod linker;
pub mod note;
pub mod opcode;
pub mod path;
pub mod sample;
pub mod slotted;
pub mod tables;
pub mod waveform;

pub use compiler::{CompiledTracks, Compiler};
pub use error::{CompileError, CompileResult};
