pub mod gradient_clipper;
pub mod lr_scheduler;

use ndarray::{Array2, Array1};
use serde::{Serialize, Deserialize};

use crate::layers::DenseLayer;

pub use gradient_clipper::GradientClipper;
pub use lr_scheduler::LearningRateScheduler;

/// Parameter update rule. `layer` identifies the per-layer state slot.
pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Called once after every layer of a mini-batch has been updated
    fn step(&mut self) {}
}

/// Optimizer selection in configuration files
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    /// Build the optimizer `kind` with state shaped after `layers`
    pub fn for_layers(kind: OptimizerKind, layers: &[DenseLayer]) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default(layers)),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias-corrected moment estimates, one state slot per layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    pub t: usize,
}

impl Adam {
    pub fn new(layers: &[DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: layers.iter().map(|layer| Array2::zeros(layer.weights.dim())).collect(),
            v_weights: layers.iter().map(|layer| Array2::zeros(layer.weights.dim())).collect(),
            m_biases: layers.iter().map(|layer| Array1::zeros(layer.biases.dim())).collect(),
            v_biases: layers.iter().map(|layer| Array1::zeros(layer.biases.dim())).collect(),
            t: 1,
        }
    }

    pub fn default(layers: &[DenseLayer]) -> Self {
        Self::new(layers, 0.9, 0.999, 1e-8)
    }

    fn corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
    }

    fn step(&mut self) {
        self.t += 1;
    }
}
