//! Payload transport between the coordinator and workers.
//!
//! Block arrays travel either as shared immutable buffers (read by view,
//! no copy) or by ownership transfer. Both carry a 16-byte header —
//! `(block_count: u32, origin: i32 x 3)` — ahead of the packed blocks.

use crate::chunk::partition::BLOCK_STRIDE;
use crate::error::{MeshError, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Header length in i32 lanes.
const HEADER_LANES: usize = 4;

/// A chunk's block array in transit.
#[derive(Debug, Clone)]
pub enum ChunkPayload {
    /// Shared immutable buffer; the worker reads by view.
    Shared(Arc<[i32]>),
    /// Ownership-transferred buffer.
    Owned(Vec<i32>),
}

impl ChunkPayload {
    /// Pack a block array with its header. `shared` selects the zero-copy
    /// representation when the host allows it.
    pub fn encode(origin: [i32; 3], blocks: &[i32], shared: bool) -> Self {
        debug_assert_eq!(blocks.len() % BLOCK_STRIDE, 0);
        let mut data = Vec::with_capacity(HEADER_LANES + blocks.len());
        data.push((blocks.len() / BLOCK_STRIDE) as i32);
        data.extend_from_slice(&origin);
        data.extend_from_slice(blocks);
        if shared {
            ChunkPayload::Shared(Arc::from(data))
        } else {
            ChunkPayload::Owned(data)
        }
    }

    fn raw(&self) -> &[i32] {
        match self {
            ChunkPayload::Shared(data) => data,
            ChunkPayload::Owned(data) => data,
        }
    }

    /// Decode into `(origin, blocks)`, validating the header.
    pub fn decode(&self) -> Result<([i32; 3], &[i32])> {
        let raw = self.raw();
        if raw.len() < HEADER_LANES {
            return Err(MeshError::Transport("payload shorter than header".into()));
        }
        let count = raw[0];
        if count < 0 {
            return Err(MeshError::Transport("negative block count".into()));
        }
        let expected = HEADER_LANES + count as usize * BLOCK_STRIDE;
        if raw.len() != expected {
            return Err(MeshError::Transport(format!(
                "payload length {} does not match header count {}",
                raw.len(),
                count
            )));
        }
        let origin = [raw[1], raw[2], raw[3]];
        Ok((origin, &raw[HEADER_LANES..]))
    }
}

/// Cap on recycled buffers per size bucket.
const BUCKET_CAP: usize = 10;

/// Size-bucketed free list for geometry scratch buffers.
///
/// Buffers bucket by rounded-up capacity; returning a buffer either slots
/// it into its bucket or drops it when the bucket is full.
pub struct BufferPool<T> {
    buckets: FxHashMap<usize, Vec<Vec<T>>>,
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self {
            buckets: FxHashMap::default(),
        }
    }
}

impl<T> BufferPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_for(capacity: usize) -> usize {
        capacity.next_power_of_two().max(64)
    }

    /// Take a cleared buffer with at least `capacity` slots.
    pub fn acquire(&mut self, capacity: usize) -> Vec<T> {
        let bucket = Self::bucket_for(capacity);
        match self.buckets.get_mut(&bucket).and_then(|b| b.pop()) {
            Some(mut buffer) => {
                buffer.clear();
                buffer
            }
            None => Vec::with_capacity(bucket),
        }
    }

    /// Return a buffer to its bucket, or drop it when the bucket is full.
    pub fn release(&mut self, buffer: Vec<T>) {
        if buffer.capacity() == 0 {
            return;
        }
        let bucket = Self::bucket_for(buffer.capacity());
        let entries = self.buckets.entry(bucket).or_default();
        if entries.len() < BUCKET_CAP {
            entries.push(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let blocks = vec![1, 2, 3, 0, 4, 5, 6, 1];
        for shared in [false, true] {
            let payload = ChunkPayload::encode([16, -32, 0], &blocks, shared);
            let (origin, decoded) = payload.decode().unwrap();
            assert_eq!(origin, [16, -32, 0]);
            assert_eq!(decoded, &blocks[..]);
        }
    }

    #[test]
    fn test_payload_empty() {
        let payload = ChunkPayload::encode([0, 0, 0], &[], true);
        let (_, decoded) = payload.decode().unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_payload_rejects_truncation() {
        let ChunkPayload::Owned(mut data) =
            ChunkPayload::encode([0, 0, 0], &[1, 2, 3, 0], false)
        else {
            panic!("expected owned payload");
        };
        data.pop();
        let err = ChunkPayload::Owned(data).decode().unwrap_err();
        assert!(matches!(err, MeshError::Transport(_)));
    }

    #[test]
    fn test_payload_rejects_short_header() {
        let err = ChunkPayload::Owned(vec![1, 2]).decode().unwrap_err();
        assert!(matches!(err, MeshError::Transport(_)));
    }

    #[test]
    fn test_buffer_pool_recycles() {
        let mut pool: BufferPool<u32> = BufferPool::new();
        let mut buffer = pool.acquire(100);
        buffer.resize(100, 7);
        let capacity = buffer.capacity();
        pool.release(buffer);

        let again = pool.acquire(100);
        assert!(again.is_empty());
        assert_eq!(again.capacity(), capacity);
    }

    #[test]
    fn test_buffer_pool_bucket_cap() {
        let mut pool: BufferPool<u8> = BufferPool::new();
        for _ in 0..20 {
            pool.release(Vec::with_capacity(128));
        }
        let bucket = pool.buckets.get(&128).unwrap();
        assert_eq!(bucket.len(), 10);
    }
}
