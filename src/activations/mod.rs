//! # Activation Functions Module
//!
//! Activation functions used by the policy, critic and value networks.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)` - hidden layers of every network in the crate
//! - **Tanh**: bounded output of the deterministic policy, later rescaled to the action bounds
//! - **Linear**: identity, used for Q-value, state-value and logit heads
//! - **Sigmoid** and **LeakyReLU**: available for custom architectures
//!
//! The module also hosts [`softmax`] (with the max-subtraction trick) and
//! [`argmax`], shared by the Boltzmann exploration strategy and the categorical policy.
//!
//! ```rust
//! use polyak::activations::{softmax, Activation};
//! use ndarray::array;
//!
//! let mut batch = array![[1.0, -0.5]];
//! Activation::Relu.apply_batch(&mut batch);
//! assert_eq!(batch, array![[1.0, 0.0]]);
//!
//! let probs = softmax(array![1000.0, 1000.0].view());
//! assert!((probs.sum() - 1.0).abs() < 1e-6);
//! ```

pub mod functions;

pub use functions::{argmax, softmax, softmax_batch, Activation};
