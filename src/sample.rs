use std::path::Path;

use crate::error::{CompileError, CompileResult};

/// Decodes PCM frames out of a WAVE container. Decoding itself is a
/// downstream concern (a real decoder lives outside this crate); the
/// compiler only resolves the path and owns the raw bytes, handing them to
/// whatever `WaveDecoder` the host provides.
pub trait WaveDecoder {
    fn decode(&self, path: &Path) -> std::io::Result<Vec<i16>>;
}

/// Reads the file as-is and reinterprets its bytes as little-endian i16
/// frames, skipping nothing. Sufficient for hosts that hand this crate
/// pre-extracted raw PCM rather than a full WAVE container; a production
/// host is expected to supply its own `WaveDecoder` that understands RIFF
/// chunk layout.
#[derive(Debug, Default)]
pub struct RawPcmDecoder;

impl WaveDecoder for RawPcmDecoder {
    fn decode(&self, path: &Path) -> std::io::Result<Vec<i16>> {
        let bytes = std::fs::read(path)?;
        Ok(bytes.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]])).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleAttr {
    Pitch,
}

#[derive(Debug, Clone, Default)]
pub struct SampleData {
    pub frames: Vec<i16>,
    pub pitch: i32,
    pub sustain_range: Option<(i32, i32)>,
}

impl SampleData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_wave(&mut self, path: &Path, decoder: &dyn WaveDecoder) -> CompileResult<()> {
        self.frames = decoder.decode(path).map_err(|source| CompileError::WaveRead {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn set_attr(&mut self, attr: SampleAttr, value: i32) {
        match attr {
            SampleAttr::Pitch => self.pitch = value,
        }
    }

    pub fn set_sustain_range(&mut self, from: i32, to: i32) {
        self.sustain_range = Some((from, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sustain_range_is_kept_verbatim() {
        let mut sample = SampleData::new();
        sample.set_sustain_range(10, 20);
        assert_eq!(sample.sustain_range, Some((10, 20)));
    }

    #[test]
    fn load_wave_reads_raw_pcm_frames() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0x01, 0xFF, 0xFF]).unwrap();
        let mut sample = SampleData::new();
        sample.load_wave(file.path(), &RawPcmDecoder).unwrap();
        assert_eq!(sample.frames, vec![0x0100, -1]);
    }

    #[test]
    fn load_wave_propagates_io_errors() {
        let mut sample = SampleData::new();
        let err = sample.load_wave(Path::new("/nonexistent/path/sample.wav"), &RawPcmDecoder);
        assert!(err.is_err());
    }
}
