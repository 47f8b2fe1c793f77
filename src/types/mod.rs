use ndarray::{Array1, ArrayView1, ArrayView2, Array2, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{PolyakError, Result};

/// An action chosen by a strategy or policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Index into a discrete action set
    Discrete(usize),
    /// Real-valued action vector
    Continuous(Array1<f32>),
}

impl Action {
    /// Convert action to integer (for discrete actions)
    pub fn to_discrete(&self) -> Option<usize> {
        match self {
            Action::Discrete(index) => Some(*index),
            Action::Continuous(_) => None,
        }
    }

    /// Convert action to continuous values
    pub fn to_continuous(&self) -> Option<Array1<f32>> {
        match self {
            Action::Continuous(values) => Some(values.clone()),
            Action::Discrete(_) => None,
        }
    }

    pub fn into_continuous(self) -> Result<Array1<f32>> {
        match self {
            Action::Continuous(values) => Ok(values),
            Action::Discrete(index) => Err(PolyakError::invalid_parameter(
                "action".to_string(),
                format!("expected a continuous action, got discrete index {}", index),
            )),
        }
    }

    pub fn into_discrete(self) -> Result<usize> {
        match self {
            Action::Discrete(index) => Ok(index),
            Action::Continuous(values) => Err(PolyakError::invalid_parameter(
                "action".to_string(),
                format!("expected a discrete action, got {} continuous values", values.len()),
            )),
        }
    }

    /// Check if action is discrete
    pub fn is_discrete(&self) -> bool {
        matches!(self, Action::Discrete(_))
    }
}

/// Per-dimension action bounds with `low[i] < high[i]` for every dimension
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionBounds {
    low: Array1<f32>,
    high: Array1<f32>,
}

impl ActionBounds {
    pub fn new(low: Array1<f32>, high: Array1<f32>) -> Result<Self> {
        if low.is_empty() {
            return Err(PolyakError::configuration("action bounds must have at least one dimension"));
        }
        if low.len() != high.len() {
            return Err(PolyakError::configuration(format!(
                "action bounds length mismatch: low has {} dimensions, high has {}",
                low.len(),
                high.len()
            )));
        }
        if let Some(i) = low.iter().zip(high.iter()).position(|(l, h)| !(l < h)) {
            return Err(PolyakError::configuration(format!(
                "action bounds require low < high, dimension {} has low={} high={}",
                i, low[i], high[i]
            )));
        }
        Ok(ActionBounds { low, high })
    }

    /// Same bounds `[low, high]` on every one of `dim` dimensions
    pub fn uniform(dim: usize, low: f32, high: f32) -> Result<Self> {
        Self::new(Array1::from_elem(dim, low), Array1::from_elem(dim, high))
    }

    pub fn low(&self) -> &Array1<f32> {
        &self.low
    }

    pub fn high(&self) -> &Array1<f32> {
        &self.high
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// `high - low` per dimension
    pub fn range(&self) -> Array1<f32> {
        &self.high - &self.low
    }

    /// Clamp a single action elementwise into `[low, high]`
    pub fn clamp(&self, action: ArrayView1<f32>) -> Array1<f32> {
        let mut out = action.to_owned();
        ndarray::Zip::from(&mut out)
            .and(&self.low)
            .and(&self.high)
            .for_each(|a, &l, &h| *a = a.max(l).min(h));
        out
    }

    /// Clamp every row of a batch of actions into `[low, high]`
    pub fn clamp_batch(&self, actions: ArrayView2<f32>) -> Array2<f32> {
        clamp_rows(actions, self.low.view(), self.high.view())
    }

    /// Whether every component lies in `[low, high]`
    pub fn contains(&self, action: ArrayView1<f32>) -> bool {
        action.len() == self.dim()
            && action
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(&a, (&l, &h))| a >= l && a <= h)
    }
}

/// Clamp every row of `values` elementwise into `[low, high]`
pub fn clamp_rows(values: ArrayView2<f32>, low: ArrayView1<f32>, high: ArrayView1<f32>) -> Array2<f32> {
    let mut out = values.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        ndarray::Zip::from(&mut row)
            .and(&low)
            .and(&high)
            .for_each(|a, &l, &h| *a = a.max(l).min(h));
    }
    out
}
