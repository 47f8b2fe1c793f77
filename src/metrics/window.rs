use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

/// Rolling window over the most recent `capacity` scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWindow {
    scores: VecDeque<f32>,
    capacity: usize,
}

impl ScoreWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ScoreWindow {
            scores: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, score: f32) {
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.scores.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mean(&self) -> Option<f32> {
        if self.scores.is_empty() {
            return None;
        }
        Some(self.scores.iter().sum::<f32>() / self.scores.len() as f32)
    }

    /// Population standard deviation
    pub fn std(&self) -> Option<f32> {
        let mean = self.mean()?;
        let var = self.scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / self.scores.len() as f32;
        Some(var.sqrt())
    }

    /// Mean of the window, but only once it is full
    pub fn full_mean(&self) -> Option<f32> {
        if self.is_full() {
            self.mean()
        } else {
            None
        }
    }
}
