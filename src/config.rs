//! Configuration for the agents and training drivers.
//!
//! All knobs are read once at construction. Configs round-trip through YAML.
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use crate::error::{PolyakError, Result};

fn load_yaml<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path)?;
    let rdr = BufReader::new(file);
    Ok(serde_yaml::from_reader(rdr)?)
}

fn save_yaml<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(serde_yaml::to_string(value)?.as_bytes())?;
    Ok(())
}

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(PolyakError::Configuration(message()))
    }
}

/// Hyperparameters of a [`TD3Agent`](crate::algorithms::td3::TD3Agent).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TD3Config {
    /// Replay buffer capacity.
    pub buffer_size: usize,

    /// Minibatch size for each learn step.
    pub batch_size: usize,

    /// Hidden layer widths shared by the policy and both critic streams.
    pub hidden_dims: Vec<usize>,

    /// Adam learning rate for the policy and the critic.
    pub learning_rate: f32,

    /// Polyak mixing ratio. Must be set when targets are synced by averaging.
    pub tau: Option<f32>,

    /// Discount factor.
    pub gamma: f32,

    /// Learning starts once the buffer holds more than `batch_size * n_warmup_batches` transitions.
    pub n_warmup_batches: usize,

    /// Std of the target-policy smoothing noise, as a fraction of the action range.
    pub policy_noise_ratio: f32,

    /// Smoothing noise is clamped to `[low * ratio, high * ratio]`.
    pub policy_noise_clip_ratio: f32,

    /// The actor is updated on every `train_actor_every`-th learn call.
    pub train_actor_every: usize,

    /// Exploration noise schedule.
    pub init_noise_ratio: f32,
    pub min_noise_ratio: f32,
    pub noise_decay_steps: usize,

    /// Gradient-norm bound for policy updates. `None` leaves gradients unclipped.
    pub policy_max_grad_norm: Option<f32>,

    /// Gradient-norm bound for critic updates. `None` leaves gradients unclipped.
    pub critic_max_grad_norm: Option<f32>,

    /// Seed for every random generator the agent owns.
    pub seed: u64,
}

impl Default for TD3Config {
    fn default() -> Self {
        Self {
            buffer_size: 1_000_000,
            batch_size: 256,
            hidden_dims: vec![256, 256],
            learning_rate: 3e-4,
            tau: Some(0.01),
            gamma: 0.99,
            n_warmup_batches: 5,
            policy_noise_ratio: 0.1,
            policy_noise_clip_ratio: 0.5,
            train_actor_every: 2,
            init_noise_ratio: 0.5,
            min_noise_ratio: 0.1,
            noise_decay_steps: 200_000,
            policy_max_grad_norm: None,
            critic_max_grad_norm: None,
            seed: 42,
        }
    }
}

impl TD3Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }

    pub fn buffer_size(mut self, v: usize) -> Self {
        self.buffer_size = v;
        self
    }

    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    pub fn hidden_dims(mut self, v: Vec<usize>) -> Self {
        self.hidden_dims = v;
        self
    }

    pub fn learning_rate(mut self, v: f32) -> Self {
        self.learning_rate = v;
        self
    }

    pub fn tau(mut self, v: Option<f32>) -> Self {
        self.tau = v;
        self
    }

    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    pub fn n_warmup_batches(mut self, v: usize) -> Self {
        self.n_warmup_batches = v;
        self
    }

    pub fn policy_noise(mut self, ratio: f32, clip_ratio: f32) -> Self {
        self.policy_noise_ratio = ratio;
        self.policy_noise_clip_ratio = clip_ratio;
        self
    }

    pub fn train_actor_every(mut self, v: usize) -> Self {
        self.train_actor_every = v;
        self
    }

    pub fn exploration_noise(mut self, init_ratio: f32, min_ratio: f32, decay_steps: usize) -> Self {
        self.init_noise_ratio = init_ratio;
        self.min_noise_ratio = min_ratio;
        self.noise_decay_steps = decay_steps;
        self
    }

    pub fn max_grad_norms(mut self, policy: Option<f32>, critic: Option<f32>) -> Self {
        self.policy_max_grad_norm = policy;
        self.critic_max_grad_norm = critic;
        self
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Reject settings the agent cannot run with.
    ///
    /// A missing or out-of-range `tau` is rejected here rather than at the
    /// first sync, since averaging is the default sync mode.
    pub fn validate(&self) -> Result<()> {
        match self.tau {
            None => return Err(PolyakError::configuration("polyak averaging requires tau, but tau is None")),
            Some(tau) => check(tau > 0.0 && tau <= 1.0, || format!("tau must lie in (0, 1], got {}", tau))?,
        }
        check(self.buffer_size > 0, || "buffer_size must be greater than 0".to_string())?;
        check(self.batch_size > 0, || "batch_size must be greater than 0".to_string())?;
        check(self.train_actor_every > 0, || "train_actor_every must be greater than 0".to_string())?;
        // The buffer never holds more than `buffer_size`, so learning would never start
        let min_samples = self.batch_size.saturating_mul(self.n_warmup_batches);
        check(self.buffer_size > min_samples, || {
            format!(
                "buffer_size ({}) must exceed batch_size * n_warmup_batches ({})",
                self.buffer_size, min_samples
            )
        })?;
        check((0.0..=1.0).contains(&self.gamma), || format!("gamma must lie in [0, 1], got {}", self.gamma))?;
        check(self.learning_rate > 0.0, || format!("learning_rate must be positive, got {}", self.learning_rate))?;
        check(self.policy_noise_ratio >= 0.0 && self.policy_noise_clip_ratio >= 0.0, || {
            "policy noise ratios must be non-negative".to_string()
        })?;
        check(self.min_noise_ratio >= 0.0 && self.min_noise_ratio <= self.init_noise_ratio, || {
            format!(
                "exploration noise must satisfy 0 <= min ({}) <= init ({})",
                self.min_noise_ratio, self.init_noise_ratio
            )
        })?;
        for (name, bound) in [("policy_max_grad_norm", self.policy_max_grad_norm), ("critic_max_grad_norm", self.critic_max_grad_norm)] {
            if let Some(bound) = bound {
                check(bound > 0.0, || format!("{} must be positive, got {}", name, bound))?;
            }
        }
        Ok(())
    }
}

/// Settings of the episodic TD3 training loop.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Maximum number of training episodes.
    pub n_episodes: usize,

    /// Training stops once the rolling evaluation mean reaches this value.
    pub goal_mean_reward: f32,

    /// Number of evaluation returns in the rolling mean.
    pub eval_window: usize,

    /// Targets are synced after every `sync_every` environment steps.
    pub sync_every: usize,

    /// Sync targets by polyak averaging (`true`) or by hard copy.
    pub use_polyak: bool,

    /// Where to save the policy when the goal is reached.
    pub model_path: Option<PathBuf>,

    /// Seed passed to `reset` at the start of each episode, if any.
    pub env_seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_episodes: 1000,
            goal_mean_reward: -150.0,
            eval_window: 100,
            sync_every: 1,
            use_polyak: true,
            model_path: None,
            env_seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }

    pub fn n_episodes(mut self, v: usize) -> Self {
        self.n_episodes = v;
        self
    }

    pub fn goal_mean_reward(mut self, v: f32) -> Self {
        self.goal_mean_reward = v;
        self
    }

    pub fn eval_window(mut self, v: usize) -> Self {
        self.eval_window = v;
        self
    }

    pub fn sync_every(mut self, v: usize) -> Self {
        self.sync_every = v;
        self
    }

    pub fn use_polyak(mut self, v: bool) -> Self {
        self.use_polyak = v;
        self
    }

    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn env_seed(mut self, v: Option<u64>) -> Self {
        self.env_seed = v;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check(self.eval_window > 0, || "eval_window must be greater than 0".to_string())?;
        check(self.sync_every > 0, || "sync_every must be greater than 0".to_string())?;
        Ok(())
    }
}

/// Hyperparameters of the asynchronous advantage actor-critic trainer.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct A3CConfig {
    pub gamma: f32,

    /// Learning rate of the shared policy (Adam).
    pub policy_learning_rate: f32,

    /// Learning rate of the shared value network (RMSProp).
    pub value_learning_rate: f32,

    pub policy_hidden_dims: Vec<usize>,
    pub value_hidden_dims: Vec<usize>,

    /// Gradient-norm bound for the policy. `None` leaves gradients unclipped.
    pub policy_max_grad_norm: Option<f32>,

    /// Gradient-norm bound for the value network. `None` leaves gradients unclipped.
    pub value_max_grad_norm: Option<f32>,

    /// Weight of the entropy bonus in the policy loss.
    pub entropy_loss_weight: f32,

    /// A worker learns after at most this many steps, or at episode end.
    pub max_n_steps: usize,

    pub n_workers: usize,

    /// Episodes per worker before it gives up.
    pub n_episodes: usize,

    pub goal_mean_reward: f32,

    /// Number of evaluation scores in the rolling mean.
    pub eval_window: usize,

    pub model_path: Option<PathBuf>,

    pub seed: u64,
}

impl Default for A3CConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            policy_learning_rate: 0.0005,
            value_learning_rate: 0.0007,
            policy_hidden_dims: vec![128, 64],
            value_hidden_dims: vec![256, 128],
            policy_max_grad_norm: Some(1.0),
            value_max_grad_norm: None,
            entropy_loss_weight: 0.001,
            max_n_steps: 50,
            n_workers: 8,
            n_episodes: 5000,
            goal_mean_reward: 475.0,
            eval_window: 100,
            model_path: None,
            seed: 42,
        }
    }
}

impl A3CConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }

    pub fn learning_rates(mut self, policy: f32, value: f32) -> Self {
        self.policy_learning_rate = policy;
        self.value_learning_rate = value;
        self
    }

    pub fn hidden_dims(mut self, policy: Vec<usize>, value: Vec<usize>) -> Self {
        self.policy_hidden_dims = policy;
        self.value_hidden_dims = value;
        self
    }

    pub fn n_workers(mut self, v: usize) -> Self {
        self.n_workers = v;
        self
    }

    pub fn n_episodes(mut self, v: usize) -> Self {
        self.n_episodes = v;
        self
    }

    pub fn max_n_steps(mut self, v: usize) -> Self {
        self.max_n_steps = v;
        self
    }

    pub fn goal_mean_reward(mut self, v: f32) -> Self {
        self.goal_mean_reward = v;
        self
    }

    pub fn eval_window(mut self, v: usize) -> Self {
        self.eval_window = v;
        self
    }

    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check((0.0..=1.0).contains(&self.gamma), || format!("gamma must lie in [0, 1], got {}", self.gamma))?;
        check(self.policy_learning_rate > 0.0 && self.value_learning_rate > 0.0, || {
            "learning rates must be positive".to_string()
        })?;
        check(self.n_workers > 0, || "n_workers must be greater than 0".to_string())?;
        check(self.max_n_steps > 0, || "max_n_steps must be greater than 0".to_string())?;
        check(self.eval_window > 0, || "eval_window must be greater than 0".to_string())?;
        check(self.entropy_loss_weight >= 0.0, || "entropy_loss_weight must be non-negative".to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_td3_config_is_valid() {
        assert!(TD3Config::default().validate().is_ok());
        assert!(TrainerConfig::default().validate().is_ok());
        assert!(A3CConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_tau_is_fatal() {
        let err = TD3Config::default().tau(None).validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_tau_range() {
        assert!(TD3Config::default().tau(Some(0.0)).validate().is_err());
        assert!(TD3Config::default().tau(Some(1.5)).validate().is_err());
        assert!(TD3Config::default().tau(Some(1.0)).validate().is_ok());
    }

    #[test]
    fn test_invalid_counts() {
        assert!(TD3Config::default().batch_size(0).validate().is_err());
        assert!(TD3Config::default().train_actor_every(0).validate().is_err());
        assert!(TD3Config::default().exploration_noise(0.1, 0.5, 10).validate().is_err());
        assert!(TD3Config::default().gamma(1.2).validate().is_err());
    }

    #[test]
    fn test_buffer_must_outgrow_warmup() {
        let config = TD3Config::default().buffer_size(50).batch_size(32).n_warmup_batches(2);
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(TD3Config::default().buffer_size(64).batch_size(32).n_warmup_batches(2).validate().is_err());
        assert!(TD3Config::default().buffer_size(65).batch_size(32).n_warmup_batches(2).validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("td3.yaml");
        let config = TD3Config::default().batch_size(64).tau(Some(0.005));
        config.save(&path).unwrap();
        assert_eq!(TD3Config::load(&path).unwrap(), config);

        let path = dir.path().join("a3c.yaml");
        let config = A3CConfig::default().n_workers(2);
        config.save(&path).unwrap();
        assert_eq!(A3CConfig::load(&path).unwrap(), config);
    }
}
