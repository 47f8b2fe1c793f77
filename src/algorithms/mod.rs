//! # Actor-Critic Algorithms Module
//!
//! Two actor-critic learners with different update models.
//!
//! ## Available Algorithms
//!
//! - **TD3 (Twin Delayed Deep Deterministic Policy Gradient)**
//!   - Deterministic policy over a bounded continuous action space
//!   - Twin Q-streams; the target is the minimum of both target streams
//!   - Clipped Gaussian smoothing noise on target actions
//!   - Actor and target updates delayed relative to the critic
//!
//! - **A3C (Asynchronous Advantage Actor-Critic)**
//!   - Categorical policy over a discrete action set
//!   - Several workers, each with its own environment, send n-step gradients
//!     to one learner that owns the shared parameters
//!   - Workers pull the latest shared snapshot at segment boundaries
//!
//! Supporting pieces live in [`networks`] (policy and critic topologies) and
//! [`target`] (online/target pairs and Polyak averaging).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use polyak::algorithms::TD3Builder;
//! use polyak::types::ActionBounds;
//!
//! let bounds = ActionBounds::uniform(1, -2.0, 2.0).unwrap();
//! let agent = TD3Builder::new(3, bounds)
//!     .hidden_dims(vec![256, 256])
//!     .tau(Some(0.005))
//!     .train_actor_every(2)
//!     .build()
//!     .unwrap();
//! assert_eq!(agent.learn_calls(), 0);
//! ```

pub mod a3c;
pub mod networks;
pub mod target;
pub mod td3;

pub use a3c::{A3CAgent, A3CReport, A3CTrainer, A3CUpdate, SharedModels};
pub use networks::{CategoricalPolicy, DeterministicPolicy, PolicySample, TwinCritic};
pub use target::{SyncMode, TargetPair};
pub use td3::{LearnStats, TD3Agent, TD3Builder};
