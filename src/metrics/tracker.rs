use std::collections::VecDeque;
use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::algorithms::td3::LearnStats;
use crate::error::Result;

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, limit: usize) {
    if history.len() >= limit {
        history.pop_front();
    }
    history.push_back(value);
}

fn recent_mean(history: &VecDeque<f32>, window: usize) -> Option<f32> {
    if history.is_empty() || window == 0 {
        return None;
    }
    let n = window.min(history.len());
    Some(history.iter().rev().take(n).sum::<f32>() / n as f32)
}

/// Stores training metrics over time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub critic_losses: VecDeque<f32>,
    pub actor_losses: VecDeque<f32>,
    pub critic_grad_norms: VecDeque<f32>,

    /// Training return per episode
    pub episode_returns: VecDeque<f32>,
    pub episode_lengths: VecDeque<usize>,

    /// Greedy evaluation return per episode
    pub eval_scores: VecDeque<f32>,

    /// Exploration noise ratio (or epsilon / temperature), one per episode
    pub exploration: VecDeque<f32>,
}

/// Tracks metrics during training, keeping at most `history_size` entries per series.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_return: f32,
    current_episode_length: usize,
    episode_count: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
            current_episode_return: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
        }
    }

    /// Record the losses of one learn step
    pub fn record_learn(&mut self, stats: &LearnStats) {
        push_bounded(&mut self.metrics.critic_losses, stats.critic_loss, self.history_size);
        push_bounded(&mut self.metrics.critic_grad_norms, stats.critic_grad_norm, self.history_size);
        if let Some(actor_loss) = stats.actor_loss {
            push_bounded(&mut self.metrics.actor_losses, actor_loss, self.history_size);
        }
    }

    pub fn record_exploration(&mut self, value: f32) {
        push_bounded(&mut self.metrics.exploration, value, self.history_size);
    }

    pub fn record_eval(&mut self, score: f32) {
        push_bounded(&mut self.metrics.eval_scores, score, self.history_size);
    }

    pub fn start_episode(&mut self) {
        self.current_episode_return = 0.0;
        self.current_episode_length = 0;
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f32) {
        self.current_episode_return += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    /// End the current episode and return its undiscounted return
    pub fn end_episode(&mut self) -> f32 {
        push_bounded(&mut self.metrics.episode_returns, self.current_episode_return, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, self.current_episode_length, self.history_size);
        self.episode_count += 1;
        self.current_episode_return
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Mean of the last `window` critic losses
    pub fn avg_critic_loss(&self, window: usize) -> Option<f32> {
        recent_mean(&self.metrics.critic_losses, window)
    }

    /// Mean of the last `window` training returns
    pub fn avg_episode_return(&self, window: usize) -> Option<f32> {
        recent_mean(&self.metrics.episode_returns, window)
    }

    /// Save metrics as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.metrics = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = MetricsTracker::new(3);
        for i in 0..5 {
            tracker.record_eval(i as f32);
        }
        assert_eq!(tracker.metrics().eval_scores, VecDeque::from(vec![2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_episode_accounting() {
        let mut tracker = MetricsTracker::default();
        tracker.start_episode();
        tracker.step(1.0);
        tracker.step(2.5);
        assert_eq!(tracker.end_episode(), 3.5);
        assert_eq!(tracker.total_steps(), 2);
        assert_eq!(tracker.metrics().episode_lengths[0], 2);
        assert_eq!(tracker.avg_episode_return(10), Some(3.5));
    }

    #[test]
    fn test_delayed_actor_loss_not_recorded() {
        let mut tracker = MetricsTracker::default();
        tracker.record_learn(&LearnStats {
            critic_loss: 1.0,
            critic_grad_norm: 0.5,
            actor_loss: None,
            actor_grad_norm: None,
        });
        assert_eq!(tracker.metrics().critic_losses.len(), 1);
        assert!(tracker.metrics().actor_losses.is_empty());
    }
}
