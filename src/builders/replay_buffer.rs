use crate::replay_buffer::ReplayBuffer;
use crate::error::{PolyakError, Result};

/// Builder for ReplayBuffer
pub struct ReplayBufferBuilder {
    capacity: Option<usize>,
    batch_size: usize,
    seed: u64,
}

impl ReplayBufferBuilder {
    /// Create a new replay buffer builder
    pub fn new() -> Self {
        ReplayBufferBuilder {
            capacity: None,
            batch_size: 256,
            seed: 0,
        }
    }

    /// Set the capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the default batch size used by `sample()`
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Seed for the buffer's own sampling generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Build the replay buffer
    pub fn build(self) -> Result<ReplayBuffer> {
        let capacity = self.capacity.ok_or_else(|| PolyakError::InvalidParameter {
            name: "capacity".to_string(),
            reason: "Capacity not specified".to_string(),
        })?;

        ReplayBuffer::new(capacity, self.batch_size, self.seed)
    }
}

impl Default for ReplayBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}
