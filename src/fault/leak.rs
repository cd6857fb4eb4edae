//! Leak buffer: retained allocations that only grow until cleared.

/// Pattern written into every block so its pages are actually committed.
const FILLER: &[u8] = b"leak";

/// One opaque retained allocation.
#[derive(Debug)]
pub struct LeakBlock(Box<[u8]>);

impl LeakBlock {
    fn filled(size: usize) -> Self {
        let mut data = Vec::with_capacity(size);
        data.extend(FILLER.iter().cycle().take(size));
        Self(data.into_boxed_slice())
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Ordered sequence of retained blocks.
///
/// There is no cap: every [`append`](LeakBuffer::append) adds on top of what
/// is already held.
#[derive(Debug, Default)]
pub struct LeakBuffer {
    blocks: Vec<LeakBlock>,
}

impl LeakBuffer {
    /// Allocates a new buffer of `count` blocks of `size` bytes each.
    pub fn filled(count: usize, size: usize) -> Self {
        Self {
            blocks: std::iter::repeat_with(|| LeakBlock::filled(size))
                .take(count)
                .collect(),
        }
    }

    /// Moves every block of `other` onto the end and returns the new length.
    pub fn append(&mut self, mut other: LeakBuffer) -> usize {
        self.blocks.append(&mut other.blocks);
        self.blocks.len()
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total payload bytes held.
    pub fn payload_bytes(&self) -> usize {
        self.blocks.iter().map(LeakBlock::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_accumulates() {
        let mut buffer = LeakBuffer::default();
        assert_eq!(buffer.append(LeakBuffer::filled(10, 8)), 10);
        assert_eq!(buffer.append(LeakBuffer::filled(5, 8)), 15);
        assert_eq!(buffer.payload_bytes(), 15 * 8);
    }

    #[test]
    fn test_block_is_filled_with_pattern() {
        let block = LeakBlock::filled(6);
        assert_eq!(&*block.0, b"leakle");
    }

    #[test]
    fn test_zero_count_is_noop() {
        let mut buffer = LeakBuffer::default();
        assert_eq!(buffer.append(LeakBuffer::filled(0, 1000)), 0);
        assert!(buffer.is_empty());
    }
}
