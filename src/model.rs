//! Per-action reward regressors used by the neural agents.

use ndarray::{Array1, ArrayView1, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activations::Activation;
use crate::db::TransitionDb;
use crate::error::{Result, TycheError};
use crate::exec::{streams, ExecContext};
use crate::network::NeuralNetwork;
use crate::optimizer::{GradientClipper, LearningRateScheduler, OptimizerKind};

/// Trainable regressor from a context to one reward estimate per action.
pub trait BanditModel {
    /// Reward estimate for every action
    fn predict(&mut self, context: ArrayView1<f32>) -> Result<Array1<f32>>;

    /// Fit on mini-batches drawn from `db`; returns the last epoch's loss, or
    /// `None` when `db` holds nothing to train on.
    fn train(&mut self, db: &TransitionDb, epochs: usize, batch_size: usize) -> Result<Option<f32>>;

    /// Toggle dropout at inference time
    fn set_use_dropout(&mut self, use_dropout: bool);
}

/// Hyperparameters of a [`NeuralBanditModel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_dims: Vec<usize>,
    pub activation: Activation,
    pub optimizer: OptimizerKind,
    /// Initial learning rate
    pub lr: f32,
    /// Inverse time decay rate, `0.0` keeps the rate constant
    pub lr_decay: f32,
    /// Restart the decay schedule at every `train` call
    pub lr_reset: bool,
    /// Global gradient norm limit
    pub max_grad_norm: Option<f32>,
    /// Dropout after each hidden layer
    pub dropout_p: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_dims: vec![50, 50],
            activation: Activation::Relu,
            optimizer: OptimizerKind::Adam,
            lr: 1e-3,
            lr_decay: 0.0,
            lr_reset: true,
            max_grad_norm: None,
            dropout_p: None,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dims.iter().any(|&d| d == 0) {
            return Err(TycheError::invalid_parameter("hidden_dims", "hidden layer sizes must be positive"));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(TycheError::invalid_parameter("lr".to_string(), format!("must be positive, found {}", self.lr)));
        }
        if !(self.lr_decay.is_finite() && self.lr_decay >= 0.0) {
            return Err(TycheError::invalid_parameter(
                "lr_decay".to_string(),
                format!("must be non-negative, found {}", self.lr_decay),
            ));
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(TycheError::invalid_parameter(
                    "max_grad_norm".to_string(),
                    format!("must be positive, found {}", norm),
                ));
            }
        }
        if let Some(p) = self.dropout_p {
            if !(0.0..1.0).contains(&p) {
                return Err(TycheError::invalid_parameter("dropout_p".to_string(), format!("must be in [0, 1), found {}", p)));
            }
        }
        Ok(())
    }
}

/// Feed-forward reward model: `context_dim -> hidden_dims.. -> n_actions`.
#[derive(Debug, Clone)]
pub struct NeuralBanditModel {
    context_dim: usize,
    n_actions: usize,
    network: NeuralNetwork,
    scheduler: LearningRateScheduler,
    lr_reset: bool,
    lr_step: usize,
    use_dropout: bool,
    rng: StdRng,
}

impl NeuralBanditModel {
    /// Create a model; `member` selects the RNG stream so ensemble members
    /// start from different weights.
    pub fn new(
        context_dim: usize,
        n_actions: usize,
        config: &ModelConfig,
        exec: &ExecContext,
        member: u64,
    ) -> Result<Self> {
        config.validate()?;

        let mut rng = exec.rng(streams::MODEL + member);
        let mut layer_sizes = Vec::with_capacity(config.hidden_dims.len() + 2);
        layer_sizes.push(context_dim);
        layer_sizes.extend_from_slice(&config.hidden_dims);
        layer_sizes.push(n_actions);

        let network = NeuralNetwork::new(
            &layer_sizes,
            config.activation,
            config.dropout_p,
            config.optimizer,
            GradientClipper::from_max_norm(config.max_grad_norm),
            &mut rng,
        )?;

        Ok(NeuralBanditModel {
            context_dim,
            n_actions,
            network,
            scheduler: LearningRateScheduler::inverse_time(config.lr, config.lr_decay),
            lr_reset: config.lr_reset,
            lr_step: 0,
            use_dropout: false,
            rng,
        })
    }

    /// Latent representation and per-action reward estimates
    pub fn forward(&mut self, context: ArrayView1<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        if context.len() != self.context_dim {
            return Err(TycheError::dimension_mismatch(
                format!("context of length {}", self.context_dim),
                format!("context of length {}", context.len()),
            ));
        }

        let input = context.insert_axis(Axis(0));
        let out = if self.use_dropout {
            self.network.infer_batch_with_dropout(input, &mut self.rng)
        } else {
            self.network.infer_batch(input)
        };
        Ok((out.latent.row(0).to_owned(), out.outputs.row(0).to_owned()))
    }

    /// Learning rate the next optimisation step will use
    pub fn current_lr(&self) -> f32 {
        self.scheduler.get_lr(self.lr_step)
    }

    pub fn use_dropout(&self) -> bool {
        self.use_dropout
    }

    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    pub fn context_dim(&self) -> usize {
        self.context_dim
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }
}

impl BanditModel for NeuralBanditModel {
    fn predict(&mut self, context: ArrayView1<f32>) -> Result<Array1<f32>> {
        Ok(self.forward(context)?.1)
    }

    fn train(&mut self, db: &TransitionDb, epochs: usize, batch_size: usize) -> Result<Option<f32>> {
        if db.is_empty() || epochs == 0 {
            return Ok(None);
        }
        if self.lr_reset {
            self.lr_step = 0;
        }

        let mut loss = 0.0;
        for _ in 0..epochs {
            let batch = db.get_data(Some(batch_size.max(1)), &mut self.rng)?;
            let lr = self.scheduler.get_lr(self.lr_step);
            let stats = self.network.train_masked(
                batch.contexts.view(),
                &batch.actions,
                batch.rewards.view(),
                lr,
                &mut self.rng,
            )?;
            loss = stats.loss;
            self.lr_step += 1;
        }

        debug!(epochs, samples = db.len(), loss, "trained reward model");
        Ok(Some(loss))
    }

    fn set_use_dropout(&mut self, use_dropout: bool) {
        self.use_dropout = use_dropout;
    }
}
