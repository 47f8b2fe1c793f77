use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use crate::error::{PolyakError, Result};
use crate::types::{Action, ActionBounds};
use super::{ContinuousEnvironment, Environment, Info, Step};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// Swing-up pendulum with a continuous torque action.
///
/// Observation is `[cos(θ), sin(θ), θ̇]`; reward is
/// `-(θ² + 0.1⋅θ̇² + 0.001⋅u²)` with θ measured from upright. Episodes never
/// terminate and are truncated after `max_steps`.
#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    pub fn new(max_steps: usize, seed: u64) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn state(&self) -> Array1<f32> {
        array![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(200, 0)
    }
}

impl Environment for Pendulum {
    fn reset(&mut self, seed: Option<u64>) -> Result<(Array1<f32>, Info)> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        self.steps = 0;
        Ok((self.state(), Info::new()))
    }

    fn step(&mut self, action: &Action) -> Result<Step> {
        let torque = match action {
            Action::Continuous(values) if values.len() == 1 => values[0].clamp(-MAX_TORQUE, MAX_TORQUE),
            other => {
                return Err(PolyakError::Environment(format!(
                    "pendulum expects a single continuous torque, got {:?}",
                    other
                )))
            }
        };

        let theta = Self::angle_normalize(self.theta);
        let reward = -(theta.powi(2) + 0.1 * self.theta_dot.powi(2) + 0.001 * torque.powi(2));

        let theta_acc = (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * torque;
        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * DT;
        self.steps += 1;

        let mut info = Info::new();
        info.insert("torque".to_string(), torque);

        Ok(Step {
            next_state: self.state(),
            reward,
            terminated: false,
            truncated: self.steps >= self.max_steps,
            info,
        })
    }

    fn observation_dim(&self) -> usize {
        3
    }
}

impl ContinuousEnvironment for Pendulum {
    fn action_bounds(&self) -> Result<ActionBounds> {
        ActionBounds::uniform(1, -MAX_TORQUE, MAX_TORQUE)
    }
}
