use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{Result, TycheError};
use super::initialization::WeightInit;

/// Gradients of one dense layer for a mini-batch
#[derive(Debug, Clone)]
pub struct DenseGradients {
    /// Error signal with the activation derivative already applied
    pub adjusted_error: Array2<f32>,
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer using the initialization recommended for its
    /// activation.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        Self::new_with_init(input_size, output_size, activation, WeightInit::for_activation(&activation), rng)
    }

    /// Create a new dense layer with an explicit initialization strategy
    pub fn new_with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        DenseLayer {
            weights: init.initialize_weights((input_size, output_size), rng),
            biases: init.initialize_biases(output_size),
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    /// Forward pass for a batch, caching what the backward pass needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass without touching the backward cache
    pub fn infer_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Gradients for the cached batch given the error at this layer's output.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<DenseGradients> {
        let pre_activation_output = self.pre_activation_output.as_ref().ok_or_else(|| {
            TycheError::Training("forward_batch() must be called before backward_batch()".to_string())
        })?;
        let inputs = self.inputs.as_ref().ok_or_else(|| {
            TycheError::Training("forward_batch() must be called before backward_batch()".to_string())
        })?;

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = output_errors.to_owned() * &activation_deriv;
        let weights = inputs.t().dot(&adjusted_error);
        let biases = adjusted_error.sum_axis(Axis(0));

        Ok(DenseGradients {
            adjusted_error,
            weights,
            biases,
        })
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }
}
