use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{Result, TycheError};
use crate::layers::{DenseLayer, DropoutLayer};
use crate::loss::{Loss, MSE};
use crate::optimizer::{GradientClipper, Optimizer, OptimizerKind, OptimizerWrapper};

/// Output of a forward pass: the last hidden representation and the head output.
#[derive(Debug, Clone)]
pub struct ForwardOutput {
    pub latent: Array2<f32>,
    pub outputs: Array2<f32>,
}

/// Statistics of one optimisation step
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    pub loss: f32,
    pub grad_norm: f32,
}

/// A feed-forward network: dense hidden layers, each optionally followed by
/// dropout, and a linear head.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub dropouts: Vec<Option<DropoutLayer>>,
    pub optimizer: OptimizerWrapper,
    pub clipper: GradientClipper,
}

impl NeuralNetwork {
    /// Create a network with `layer_sizes = [input, hidden.., output]`.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        hidden_activation: Activation,
        dropout_p: Option<f32>,
        optimizer: OptimizerKind,
        clipper: GradientClipper,
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(TycheError::invalid_parameter(
                "layer_sizes",
                "Network must have at least input and output layers",
            ));
        }
        if let Some(&zero) = layer_sizes.iter().find(|&&size| size == 0) {
            return Err(TycheError::invalid_parameter(
                "layer_sizes".to_string(),
                format!("layer sizes must be positive, found {}", zero),
            ));
        }
        if let Some(p) = dropout_p {
            if !(0.0..1.0).contains(&p) {
                return Err(TycheError::invalid_parameter(
                    "dropout_p".to_string(),
                    format!("must be in [0, 1), found {}", p),
                ));
            }
        }

        let n_layers = layer_sizes.len() - 1;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i + 1 == n_layers { Activation::Linear } else { hidden_activation };
                DenseLayer::new(window[0], window[1], activation, rng)
            })
            .collect::<Vec<_>>();

        let dropouts = (0..n_layers)
            .map(|i| if i + 1 == n_layers { None } else { dropout_p.map(DropoutLayer::new) })
            .collect();

        let optimizer = OptimizerWrapper::for_layers(optimizer, &layers);

        Ok(NeuralNetwork {
            layers,
            dropouts,
            optimizer,
            clipper,
        })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    /// Inference for a single input, dropout disabled
    pub fn forward(&self, input: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>) {
        let out = self.infer_batch(input.insert_axis(Axis(0)));
        (out.latent.row(0).to_owned(), out.outputs.row(0).to_owned())
    }

    /// Inference for a batch, dropout disabled
    pub fn infer_batch(&self, inputs: ArrayView2<f32>) -> ForwardOutput {
        self.propagate(inputs, |_, x| x)
    }

    /// Inference for a batch with fresh dropout masks that are not cached
    pub fn infer_batch_with_dropout<R: Rng + ?Sized>(&self, inputs: ArrayView2<f32>, rng: &mut R) -> ForwardOutput {
        self.propagate(inputs, |dropout, x| match dropout {
            Some(dropout) => dropout.apply(x.view(), rng),
            None => x,
        })
    }

    fn propagate<F>(&self, inputs: ArrayView2<f32>, mut mask: F) -> ForwardOutput
    where
        F: FnMut(Option<&DropoutLayer>, Array2<f32>) -> Array2<f32>,
    {
        let mut current = inputs.to_owned();
        let mut latent = current.clone();
        let last = self.layers.len() - 1;
        for (i, (layer, dropout)) in self.layers.iter().zip(&self.dropouts).enumerate() {
            if i == last {
                latent = current.clone();
            }
            current = mask(dropout.as_ref(), layer.infer_batch(current.view()));
        }
        ForwardOutput {
            latent,
            outputs: current,
        }
    }

    /// Forward pass that caches activations and dropout masks for training
    fn forward_train<R: Rng + ?Sized>(&mut self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        let mut current = inputs.to_owned();
        for (layer, dropout) in self.layers.iter_mut().zip(self.dropouts.iter_mut()) {
            current = layer.forward_batch(current.view());
            if let Some(dropout) = dropout {
                current = dropout.forward_batch(current.view(), rng);
            }
        }
        current
    }

    /// Backpropagate `output_errors` through the cached forward pass
    fn backward(&self, output_errors: ArrayView2<f32>) -> Result<(Vec<Array2<f32>>, Vec<Array1<f32>>)> {
        let n = self.layers.len();
        let mut weight_grads = Vec::with_capacity(n);
        let mut bias_grads = Vec::with_capacity(n);
        let mut current_error = output_errors.to_owned();

        for i in (0..n).rev() {
            if let Some(dropout) = &self.dropouts[i] {
                current_error = dropout.backward_batch(current_error.view());
            }
            let grads = self.layers[i].backward_batch(current_error.view())?;
            if i != 0 {
                current_error = grads.adjusted_error.dot(&self.layers[i].weights.t());
            }
            weight_grads.push(grads.weights);
            bias_grads.push(grads.biases);
        }

        weight_grads.reverse();
        bias_grads.reverse();
        Ok((weight_grads, bias_grads))
    }

    /// One optimisation step that regresses only the output of the action
    /// taken in each row towards its observed reward.
    pub fn train_masked<R: Rng + ?Sized>(
        &mut self,
        inputs: ArrayView2<f32>,
        actions: &[usize],
        rewards: ArrayView1<f32>,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<StepStats> {
        if inputs.nrows() != actions.len() || actions.len() != rewards.len() {
            return Err(TycheError::dimension_mismatch(
                format!("{} actions and rewards", inputs.nrows()),
                format!("{} actions and {} rewards", actions.len(), rewards.len()),
            ));
        }
        let n_outputs = self.output_size();
        if let Some(&action) = actions.iter().find(|&&a| a >= n_outputs) {
            return Err(TycheError::InvalidAction {
                action,
                max_actions: n_outputs,
            });
        }

        let outputs = self.forward_train(inputs, rng);
        let mut targets = outputs.clone();
        for (i, (&action, &reward)) in actions.iter().zip(rewards.iter()).enumerate() {
            targets[[i, action]] = reward;
        }

        let loss = MSE.compute_batch(outputs.view(), targets.view());
        let output_errors = MSE.gradient_batch(outputs.view(), targets.view());
        let (mut weight_grads, mut bias_grads) = self.backward(output_errors.view())?;
        let grad_norm = self.clipper.clip(&mut weight_grads, &mut bias_grads);

        for (i, (layer, (wg, bg))) in self
            .layers
            .iter_mut()
            .zip(weight_grads.iter().zip(bias_grads.iter()))
            .enumerate()
        {
            self.optimizer.update_weights(i, &mut layer.weights, wg, learning_rate);
            self.optimizer.update_biases(i, &mut layer.biases, bg, learning_rate);
        }
        self.optimizer.step();

        for dropout in self.dropouts.iter_mut().flatten() {
            dropout.clear();
        }

        Ok(StepStats { loss, grad_norm })
    }
}
