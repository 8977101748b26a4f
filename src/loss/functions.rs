use ndarray::{Array2, ArrayView2};

/// Trait defining the interface for loss functions
pub trait Loss: Send + Sync {
    /// Compute the loss for a batch of predictions and targets
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32;

    /// Compute the gradient of the loss for a batch
    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32>;
}

/// Squared error summed over outputs and averaged over the batch, halved.
///
/// Targets equal to the prediction contribute neither loss nor gradient, which
/// is how the reward networks train only the output of the action taken.
pub struct MSE;

impl Loss for MSE {
    fn compute_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let batch_size = predictions.shape()[0].max(1) as f32;
        let diff = &predictions - &targets;
        (&diff * &diff).sum() / (2.0 * batch_size)
    }

    fn gradient_batch(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let batch_size = predictions.shape()[0].max(1) as f32;
        (&predictions - &targets) / batch_size
    }
}
