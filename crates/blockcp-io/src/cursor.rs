//! Shared offset cursor
//!
//! Work distribution between workers is a single fetch-and-add: each claim
//! advances the shared offset by one block and hands the claimant the range
//! `[offset, offset + len)`. Distinct workers can never receive overlapping
//! ranges, and every successful claim advances the cursor strictly, so the
//! pipeline terminates once the source range is exhausted.

use std::sync::atomic::{AtomicU64, Ordering};

/// A claimed block: the source offset and the number of bytes remaining there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockClaim {
    /// Source byte offset of the block
    pub offset: u64,
    /// Bytes to transfer: the block size, except for the final partial block
    pub len: usize,
}

/// Atomic block-granular cursor over the source byte range
#[derive(Debug)]
pub struct BlockCursor {
    next: AtomicU64,
    block_size: u64,
    source_len: u64,
}

impl BlockCursor {
    /// Create a cursor over `[0, source_len)` advancing in `block_size` strides
    pub fn new(block_size: usize, source_len: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            block_size: block_size as u64,
            source_len,
        }
    }

    /// Claim the next unread block, or `None` once the source is exhausted
    pub fn claim(&self) -> Option<BlockClaim> {
        let offset = self.next.fetch_add(self.block_size, Ordering::Relaxed);
        if offset >= self.source_len {
            return None;
        }
        let len = (self.source_len - offset).min(self.block_size) as usize;
        Some(BlockClaim { offset, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_claims_are_block_strides() {
        let cursor = BlockCursor::new(4096, 16384);
        let claims: Vec<_> = std::iter::from_fn(|| cursor.claim()).collect();
        assert_eq!(claims.len(), 4);
        for (i, claim) in claims.iter().enumerate() {
            assert_eq!(claim.offset, i as u64 * 4096);
            assert_eq!(claim.len, 4096);
        }
        assert!(cursor.claim().is_none());
    }

    #[test]
    fn test_final_partial_block() {
        let cursor = BlockCursor::new(4096, 8700);
        assert_eq!(
            cursor.claim(),
            Some(BlockClaim {
                offset: 0,
                len: 4096
            })
        );
        assert_eq!(
            cursor.claim(),
            Some(BlockClaim {
                offset: 4096,
                len: 4096
            })
        );
        assert_eq!(
            cursor.claim(),
            Some(BlockClaim {
                offset: 8192,
                len: 508
            })
        );
        assert!(cursor.claim().is_none());
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        let cursor = BlockCursor::new(4096, 0);
        assert!(cursor.claim().is_none());
        assert!(cursor.claim().is_none());
    }

    #[test]
    fn test_concurrent_claims_are_disjoint() {
        let cursor = Arc::new(BlockCursor::new(512, 512 * 1000));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cursor = Arc::clone(&cursor);
            handles.push(std::thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(claim) = cursor.claim() {
                    seen.push(claim.offset);
                }
                seen
            }));
        }
        let mut all = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for offset in handle.join().unwrap() {
                assert!(all.insert(offset), "offset {} claimed twice", offset);
                total += 1;
            }
        }
        assert_eq!(total, 1000);
    }
}
