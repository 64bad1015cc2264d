use crate::error::{CompileError, CompileResult};
use crate::tables::MAX_WAVEFORM_LENGTH;

/// A short custom waveform: a sequence of signed frames, volume-unit
/// scaled, 2..64 entries long.
#[derive(Debug, Clone, Default)]
pub struct WaveformData {
    frames: Vec<i32>,
}

impl WaveformData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frames(&mut self, frames: Vec<i32>) -> CompileResult<()> {
        if frames.len() < 2 || frames.len() > MAX_WAVEFORM_LENGTH {
            return Err(CompileError::InvalidSampleAttr(format!(
                "waveform length {} out of range (2..={})",
                frames.len(),
                MAX_WAVEFORM_LENGTH
            )));
        }
        self.frames = frames;
        Ok(())
    }

    pub fn frames(&self) -> &[i32] {
        &self.frames
    }
}
