//! Accumulates response audio fragments until the segment completes.

/// Bytes per PCM16 sample.
pub const SAMPLE_WIDTH: usize = 2;

/// Contiguous PCM byte accumulator.
///
/// Fragments are appended whole and in arrival order; nothing is reordered
/// or truncated.
#[derive(Debug, Clone, Default)]
pub struct AudioFrameBuffer {
    bytes: Vec<u8>,
}

impl AudioFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Take the accumulated bytes, leaving the buffer empty.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the buffer ends on a sample boundary.
    pub fn is_sample_aligned(&self) -> bool {
        self.bytes.len() % SAMPLE_WIDTH == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_returns_concatenation_in_order() {
        let mut buffer = AudioFrameBuffer::new();
        buffer.append(&[1, 2]);
        buffer.append(&[3, 4, 5, 6]);
        buffer.append(&[]);
        buffer.append(&[7, 8]);
        assert!(buffer.is_sample_aligned());

        assert_eq!(buffer.flush(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.flush(), Vec::<u8>::new());
    }

    #[test]
    fn odd_length_is_not_sample_aligned() {
        let mut buffer = AudioFrameBuffer::new();
        buffer.append(&[1, 2, 3]);
        assert!(!buffer.is_sample_aligned());
        buffer.clear();
        assert_eq!(buffer.len(), 0);
    }
}
