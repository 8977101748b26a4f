use ndarray::{Array2, ArrayView2};
use serde::{Serialize, Deserialize};

/// Activation applied after a dense layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Apply the activation function to a batch in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::Sigmoid => {
                inputs.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
            }
            Activation::Tanh => {
                inputs.mapv_inplace(|v| v.tanh());
            }
        }
    }

    /// Derivative with respect to the pre-activation values of a batch.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
            }
            Activation::Linear => {
                Array2::ones(inputs.dim())
            }
            Activation::Sigmoid => {
                inputs.mapv(|v| {
                    let sigmoid = 1.0 / (1.0 + (-v).exp());
                    sigmoid * (1.0 - sigmoid)
                })
            }
            Activation::Tanh => {
                inputs.mapv(|v| {
                    let tanh_v = v.tanh();
                    1.0 - tanh_v * tanh_v
                })
            }
        }
    }
}
