//! # Polyak - Actor-Critic Reinforcement Learning
//!
//! Polyak is a Rust library for continuous and discrete control with
//! actor-critic methods. It bundles the neural network primitives those
//! methods need, a TD3 agent with Polyak-averaged target networks, an
//! asynchronous A3C trainer, exploration strategies and two classic-control
//! environments for exercising them.
//!
//! ## Key Features
//!
//! - **TD3**: twin critics, target policy smoothing, delayed actor updates
//! - **A3C**: worker threads sending gradients to a single learner
//! - **Exploration**: greedy, decaying Gaussian noise, epsilon-greedy and softmax strategies
//! - **Replay**: fixed-capacity ring buffer with seeded uniform sampling
//! - **Optimizers**: SGD, Adam and RMSProp with global-norm gradient clipping
//! - **Configuration**: YAML-loadable hyperparameter structs with validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polyak::algorithms::TD3Agent;
//! use polyak::config::{TD3Config, TrainerConfig};
//! use polyak::env::{ContinuousEnvironment, Environment, Pendulum};
//! use polyak::trainer::Trainer;
//!
//! let mut env = Pendulum::default();
//! let mut agent = TD3Agent::new(env.observation_dim(), env.action_bounds()?, TD3Config::default())?;
//!
//! let trainer = Trainer::new(TrainerConfig::default().n_episodes(200))?;
//! let report = trainer.train_td3(&mut agent, &mut env)?;
//! println!("mean eval score: {:?}", report.final_mean_score);
//! # Ok::<(), polyak::error::PolyakError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions, softmax and argmax
//! - [`algorithms`] - TD3 and A3C, plus their networks and target pairs
//! - [`builders`] - Builder patterns for networks and replay buffers
//! - [`config`] - Hyperparameter structs with YAML persistence
//! - [`env`] - Environment traits, Pendulum and CartPole
//! - [`error`] - Error types and result handling
//! - [`exploration`] - Action-selection strategies and decay schedules
//! - [`layers`] - Dense layers and weight initialization
//! - [`loss`] - Loss functions for training
//! - [`metrics`] - Training metrics and rolling score windows
//! - [`network`] - Feed-forward networks, gradients and parameter snapshots
//! - [`optimizer`] - Optimization algorithms and gradient clipping
//! - [`replay_buffer`] - Experience replay for off-policy learning
//! - [`trainer`] - Episodic TD3 training driver
//! - [`types`] - Action values and action bounds

pub mod activations;
pub mod algorithms;
pub mod builders;
pub mod config;
pub mod env;
pub mod error;
pub mod exploration;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod trainer;
pub mod types;

#[cfg(test)]
mod tests;
