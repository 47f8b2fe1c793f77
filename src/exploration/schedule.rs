//! Decay schedules shared by the exploration strategies.
//!
//! Every schedule is a pure function of the selection counter `t` and is
//! clamped to `[min, init]`.

fn clamp_to(value: f32, min: f32, init: f32) -> f32 {
    value.max(min).min(init)
}

/// Linear interpolation from `init` at `t = 0` to `min` at `t = decay_steps`, then flat.
pub fn linear_decay(init: f32, min: f32, decay_steps: usize, t: usize) -> f32 {
    let progress = 1.0 - t as f32 / decay_steps.max(1) as f32;
    clamp_to((init - min) * progress + min, min, init)
}

/// Exponential decay from `init` towards `min` across `decay_steps`, then `min`.
///
/// Follows `0.01 / 10^(-2 + 2t/N) - 0.01`, rescaled to `[min, init]`. At
/// `t = 0` the shape term is `0.99`, so the first decayed value sits just
/// below `init`; the curve falls fastest early on.
pub fn exponential_decay(init: f32, min: f32, decay_steps: usize, t: usize) -> f32 {
    if decay_steps == 0 || t >= decay_steps {
        return min;
    }
    let exponent = -2.0 + 2.0 * t as f64 / decay_steps as f64;
    let shape = 0.01 / 10f64.powf(exponent) - 0.01;
    clamp_to(shape as f32 * (init - min) + min, min, init)
}

/// Boltzmann temperature, linear over the first `max_steps * exploration_ratio` selections.
pub fn softmax_temperature(init: f32, min: f32, max_steps: usize, exploration_ratio: f32, t: usize) -> f32 {
    let horizon = (max_steps as f32 * exploration_ratio).max(1.0);
    clamp_to((init - min) * (1.0 - t as f32 / horizon) + min, min, init)
}
