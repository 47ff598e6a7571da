//! Chunk planning and the remaining-item queue.

use crate::error::{BulkError, BulkResult};

/// How N items will be processed for a given chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub total: usize,
    pub chunk_size: usize,
    pub chunk_count: usize,
}

impl ChunkPlan {
    /// More than one call is needed. Only chunked plans get a progress
    /// indicator.
    pub fn is_chunked(&self) -> bool {
        self.total > self.chunk_size
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Splits item collections into fixed-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    chunk_size: usize,
}

impl ChunkPlanner {
    pub fn new(chunk_size: usize) -> BulkResult<Self> {
        if chunk_size == 0 {
            return Err(BulkError::invalid_request("chunk size must be at least 1"));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn plan(&self, total: usize) -> ChunkPlan {
        ChunkPlan {
            total,
            chunk_size: self.chunk_size,
            chunk_count: total.div_ceil(self.chunk_size),
        }
    }
}

/// Items still waiting to be sent.
///
/// Chunks are taken from the end of the queue, last item first. Callers must
/// not depend on the order of items within a chunk.
#[derive(Debug, Clone, Default)]
pub struct ItemQueue {
    items: Vec<String>,
}

impl ItemQueue {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove up to `size` items, or `None` once the queue is exhausted.
    pub fn take_chunk(&mut self, size: usize) -> Option<Vec<String>> {
        if self.items.is_empty() || size == 0 {
            return None;
        }
        let split = self.items.len().saturating_sub(size);
        let mut chunk = self.items.split_off(split);
        chunk.reverse();
        Some(chunk)
    }

    /// Drop everything still queued.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
