use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};

/// Inverted dropout.
///
/// Randomly zeroes units with probability `dropout_rate` and scales the
/// survivors by `1 / (1 - dropout_rate)`, so no rescaling is needed when the
/// layer is switched off.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DropoutLayer {
    /// Probability of dropping a unit
    pub dropout_rate: f32,

    /// Cached mask for the backward pass
    #[serde(skip)]
    cached_mask: Option<Array2<f32>>,
}

impl DropoutLayer {
    pub fn new(dropout_rate: f32) -> Self {
        assert!((0.0..1.0).contains(&dropout_rate),
                "Dropout rate must be in [0, 1)");

        DropoutLayer {
            dropout_rate,
            cached_mask: None,
        }
    }

    /// Apply a freshly drawn mask and cache it for the backward pass
    pub fn forward_batch<R: Rng + ?Sized>(&mut self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        let (output, mask) = self.masked(inputs, rng);
        self.cached_mask = mask;
        output
    }

    /// Apply a freshly drawn mask without caching it
    pub fn apply<R: Rng + ?Sized>(&self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        self.masked(inputs, rng).0
    }

    fn masked<R: Rng + ?Sized>(&self, inputs: ArrayView2<f32>, rng: &mut R) -> (Array2<f32>, Option<Array2<f32>>) {
        if self.dropout_rate == 0.0 {
            return (inputs.to_owned(), None);
        }

        let scale = 1.0 / (1.0 - self.dropout_rate);
        let rate = self.dropout_rate;
        let mask = Array2::from_shape_fn(inputs.dim(), |_| {
            if rng.gen::<f32>() >= rate { scale } else { 0.0 }
        });

        (&inputs * &mask, Some(mask))
    }

    /// Route gradients through the units kept by the last forward pass
    pub fn backward_batch(&self, grad_output: ArrayView2<f32>) -> Array2<f32> {
        match self.cached_mask {
            Some(ref mask) => &grad_output * mask,
            None => grad_output.to_owned(),
        }
    }

    /// Forget the cached mask
    pub fn clear(&mut self) {
        self.cached_mask = None;
    }
}
