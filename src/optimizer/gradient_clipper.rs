use serde::{Serialize, Deserialize};

use crate::network::Gradients;

/// Gradient clipping methods
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum GradientClipper {
    /// Clip the norm taken across all parameters of the model
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    #[default]
    None,
}

impl GradientClipper {
    /// Build from an optional global-norm bound; `None` or infinity disables clipping.
    pub fn from_max_norm(max_norm: Option<f32>) -> Self {
        match max_norm {
            Some(max_norm) if max_norm.is_finite() => GradientClipper::ClipByGlobalNorm { max_norm },
            _ => GradientClipper::None,
        }
    }

    /// Clip `gradients` in place and return their global norm before clipping.
    pub fn clip(&self, gradients: &mut Gradients) -> f32 {
        let norm = gradients.global_norm();
        match self {
            GradientClipper::ClipByGlobalNorm { max_norm } => {
                gradients.clip_norm(Some(*max_norm));
            }

            GradientClipper::None => {}
        }
        norm
    }
}
