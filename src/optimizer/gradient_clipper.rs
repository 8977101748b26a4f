use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

/// Gradient clipping methods
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GradientClipper {
    /// Rescale every gradient so that their joint L2 norm is at most `max_norm`
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl GradientClipper {
    /// `ClipByGlobalNorm` when a positive finite norm is given, otherwise `None`
    pub fn from_max_norm(max_norm: Option<f32>) -> Self {
        match max_norm {
            Some(max_norm) if max_norm.is_finite() && max_norm > 0.0 => {
                GradientClipper::ClipByGlobalNorm { max_norm }
            }
            _ => GradientClipper::None,
        }
    }

    /// Compute global norm of all gradients
    pub fn compute_global_norm(weight_grads: &[Array2<f32>], bias_grads: &[Array1<f32>]) -> f32 {
        let weight_norm_sq: f32 = weight_grads.iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f32>())
            .sum();

        let bias_norm_sq: f32 = bias_grads.iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f32>())
            .sum();

        (weight_norm_sq + bias_norm_sq).sqrt()
    }

    /// Clip in place; returns the norm measured before clipping
    pub fn clip(&self, weight_grads: &mut [Array2<f32>], bias_grads: &mut [Array1<f32>]) -> f32 {
        let global_norm = Self::compute_global_norm(weight_grads, bias_grads);

        if let GradientClipper::ClipByGlobalNorm { max_norm } = *self {
            if global_norm > max_norm {
                let scale = max_norm / global_norm;

                for grad in weight_grads.iter_mut() {
                    grad.mapv_inplace(|g| g * scale);
                }

                for grad in bias_grads.iter_mut() {
                    grad.mapv_inplace(|g| g * scale);
                }
            }
        }

        global_norm
    }
}
