use byteorder::{WriteBytesExt, LE};

/// Append-only byte sequence used for both per-track global code and
/// per-group code. Backed by a single contiguous `Vec<u8>` — a standard
/// growable array already amortizes the chunked-growth problem the
/// original segmented-storage design worked around, so there is no need
/// to reproduce that segmentation here.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        ByteBuffer { bytes: Vec::new() }
    }

    pub fn push_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn push_u16(&mut self, value: u16) {
        self.bytes.write_u16::<LE>(value).expect("Vec<u8> write is infallible");
    }

    pub fn push_i16(&mut self, value: i16) {
        self.bytes.write_i16::<LE>(value).expect("Vec<u8> write is infallible");
    }

    pub fn push_i32(&mut self, value: i32) {
        self.bytes.write_i32::<LE>(value).expect("Vec<u8> write is infallible");
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Append `other`'s bytes onto `self`, leaving `other` untouched.
    pub fn append_from(&mut self, other: &ByteBuffer) {
        self.bytes.extend_from_slice(&other.bytes);
    }

    /// Empties the buffer. `retain_capacity` mirrors the compiler's
    /// `reset(keepData)` distinction: a group buffer being reused across
    /// compilations can keep its allocation, one being discarded for good
    /// should not.
    pub fn clear(&mut self, retain_capacity: bool) {
        if retain_capacity {
            self.bytes.clear();
        } else {
            self.bytes = Vec::new();
        }
    }
}
