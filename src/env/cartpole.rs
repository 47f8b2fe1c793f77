use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PolyakError, Result};
use crate::types::Action;
use super::{DiscreteEnvironment, Environment, Info, Step};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
const HALF_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * HALF_LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const X_THRESHOLD: f32 = 2.4;

/// Cart-pole balancing with two discrete actions (push left, push right).
///
/// Reward is `1.0` per step. The episode terminates when the pole falls past
/// 12 degrees or the cart leaves the track, and is truncated after `max_steps`.
#[derive(Debug, Clone)]
pub struct CartPole {
    state: [f32; 4],
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl CartPole {
    pub fn new(max_steps: usize, seed: u64) -> Self {
        Self {
            state: [0.0; 4],
            steps: 0,
            max_steps,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn observation(&self) -> Array1<f32> {
        Array1::from(self.state.to_vec())
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new(500, 0)
    }
}

impl Environment for CartPole {
    fn reset(&mut self, seed: Option<u64>) -> Result<(Array1<f32>, Info)> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        for v in self.state.iter_mut() {
            *v = self.rng.gen_range(-0.05..0.05);
        }
        self.steps = 0;
        Ok((self.observation(), Info::new()))
    }

    fn step(&mut self, action: &Action) -> Result<Step> {
        let force = match action {
            Action::Discrete(0) => -FORCE_MAG,
            Action::Discrete(1) => FORCE_MAG,
            other => {
                return Err(PolyakError::Environment(format!(
                    "cart-pole expects discrete action 0 or 1, got {:?}",
                    other
                )))
            }
        };

        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin, cos) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (HALF_LENGTH * (4.0 / 3.0 - MASS_POLE * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.steps += 1;

        let terminated = self.state[0].abs() > X_THRESHOLD || self.state[2].abs() > THETA_THRESHOLD;

        Ok(Step {
            next_state: self.observation(),
            reward: 1.0,
            terminated,
            truncated: !terminated && self.steps >= self.max_steps,
            info: Info::new(),
        })
    }

    fn observation_dim(&self) -> usize {
        4
    }
}

impl DiscreteEnvironment for CartPole {
    fn n_actions(&self) -> usize {
        2
    }
}
