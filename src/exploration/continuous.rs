use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Serialize, Deserialize};

use crate::activations::argmax;
use crate::error::{PolyakError, Result};
use crate::types::{Action, ActionBounds};
use super::schedule::linear_decay;
use super::Model;

/// Pure exploitation: the model's output clamped into bounds, or the
/// arg-max index when no bounds are configured.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GreedyStrategy {
    bounds: Option<ActionBounds>,
}

impl GreedyStrategy {
    /// Greedy over a value model's outputs
    pub fn new() -> Self {
        GreedyStrategy { bounds: None }
    }

    /// Greedy over a deterministic policy's continuous output
    pub fn with_bounds(bounds: ActionBounds) -> Self {
        GreedyStrategy { bounds: Some(bounds) }
    }

    pub fn select_action<M: Model + ?Sized>(&self, model: &M, state: ArrayView1<f32>) -> Result<Action> {
        let output = model.predict(state);
        match &self.bounds {
            Some(bounds) => {
                if output.len() != bounds.dim() {
                    return Err(PolyakError::dimension_mismatch(
                        format!("{} action dimensions", bounds.dim()),
                        format!("{} action dimensions", output.len()),
                    ));
                }
                Ok(Action::Continuous(bounds.clamp(output.view())))
            }
            None => Ok(Action::Discrete(argmax(output.view()))),
        }
    }
}

/// Gaussian exploration noise whose scale decays linearly with use.
///
/// The standard deviation on dimension `i` is `noise_ratio * (high[i] - low[i])`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalNoiseDecayStrategy {
    bounds: ActionBounds,
    init_noise_ratio: f32,
    min_noise_ratio: f32,
    decay_steps: usize,
    t: usize,
    noise_ratio: f32,
    ratio_noise_injected: f32,
}

impl NormalNoiseDecayStrategy {
    pub fn new(bounds: ActionBounds, init_noise_ratio: f32, min_noise_ratio: f32, decay_steps: usize) -> Result<Self> {
        if !(min_noise_ratio >= 0.0 && min_noise_ratio <= init_noise_ratio) {
            return Err(PolyakError::configuration(format!(
                "noise ratios must satisfy 0 <= min ({}) <= init ({})",
                min_noise_ratio, init_noise_ratio
            )));
        }
        Ok(NormalNoiseDecayStrategy {
            bounds,
            init_noise_ratio,
            min_noise_ratio,
            decay_steps,
            t: 0,
            noise_ratio: init_noise_ratio,
            ratio_noise_injected: 0.0,
        })
    }

    /// Noise ratio used by the most recent selection (`init` before the first)
    pub fn noise_ratio(&self) -> f32 {
        self.noise_ratio
    }

    /// Mean absolute perturbation of the last action as a fraction of the action range
    pub fn ratio_noise_injected(&self) -> f32 {
        self.ratio_noise_injected
    }

    /// Number of selections made so far
    pub fn steps(&self) -> usize {
        self.t
    }

    pub fn bounds(&self) -> &ActionBounds {
        &self.bounds
    }

    pub fn select_action<M: Model + ?Sized, R: Rng + ?Sized>(
        &mut self,
        model: &M,
        state: ArrayView1<f32>,
        max_exploration: bool,
        rng: &mut R,
    ) -> Result<Action> {
        let greedy = model.predict(state);
        if greedy.len() != self.bounds.dim() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} action dimensions", self.bounds.dim()),
                format!("{} action dimensions", greedy.len()),
            ));
        }

        self.noise_ratio = linear_decay(self.init_noise_ratio, self.min_noise_ratio, self.decay_steps, self.t);
        self.t += 1;

        let range = self.bounds.range();
        let scale = if max_exploration { 0.5 } else { self.noise_ratio };
        let noise: Array1<f32> = range.mapv(|r| rng.sample::<f32, _>(StandardNormal) * scale * r);

        let action = self.bounds.clamp((&greedy + &noise).view());
        self.ratio_noise_injected = ((&greedy - &action).mapv(f32::abs) / &range).mean().unwrap_or(0.0);

        Ok(Action::Continuous(action))
    }
}
