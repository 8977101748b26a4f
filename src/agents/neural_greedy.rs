use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_action, check_context, check_dims, first_max, DcbAgent, WarmUp};
use crate::db::TransitionDb;
use crate::error::{Result, TycheError};
use crate::exec::ExecContext;
use crate::model::{BanditModel, ModelConfig, NeuralBanditModel};

/// Hyperparameters of a [`NeuralGreedyAgent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralGreedyConfig {
    pub init_pulls: usize,
    pub model: ModelConfig,
    pub train_epochs: usize,
    pub batch_size: usize,
    /// Retrain on every n-th update
    pub nn_update_interval: usize,
}

impl Default for NeuralGreedyConfig {
    fn default() -> Self {
        NeuralGreedyConfig {
            init_pulls: 2,
            model: ModelConfig {
                hidden_dims: vec![100, 100],
                lr: 1e-3,
                ..ModelConfig::default()
            },
            train_epochs: 20,
            batch_size: 64,
            nn_update_interval: 20,
        }
    }
}

impl NeuralGreedyConfig {
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if self.batch_size == 0 {
            return Err(TycheError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if self.nn_update_interval == 0 {
            return Err(TycheError::invalid_parameter("nn_update_interval", "must be at least 1"));
        }
        Ok(())
    }
}

/// Greedy agent over a single neural reward model.
///
/// Exploration comes only from the warm-up phase and the noise of
/// stochastic training.
#[derive(Debug, Clone)]
pub struct NeuralGreedyAgent<M: BanditModel = NeuralBanditModel> {
    context_dim: usize,
    n_actions: usize,
    config: NeuralGreedyConfig,
    model: M,
    db: TransitionDb,
    warm_up: WarmUp,
    update_count: usize,
}

impl NeuralGreedyAgent<NeuralBanditModel> {
    pub fn new(context_dim: usize, n_actions: usize, config: NeuralGreedyConfig, exec: &ExecContext) -> Result<Self> {
        check_dims(context_dim, n_actions)?;
        let model = NeuralBanditModel::new(context_dim, n_actions, &config.model, exec, 0)?;
        Self::with_model(context_dim, n_actions, model, config)
    }
}

impl<M: BanditModel> NeuralGreedyAgent<M> {
    /// Wrap an existing reward model
    pub fn with_model(context_dim: usize, n_actions: usize, model: M, config: NeuralGreedyConfig) -> Result<Self> {
        check_dims(context_dim, n_actions)?;
        config.validate()?;

        Ok(NeuralGreedyAgent {
            context_dim,
            n_actions,
            model,
            db: TransitionDb::new(context_dim, n_actions),
            warm_up: WarmUp::new(n_actions, config.init_pulls)?,
            update_count: 0,
            config,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn db(&self) -> &TransitionDb {
        &self.db
    }

    pub fn config(&self) -> &NeuralGreedyConfig {
        &self.config
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }
}

impl<M: BanditModel> DcbAgent for NeuralGreedyAgent<M> {
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn context_dim(&self) -> usize {
        self.context_dim
    }

    fn select_action(&mut self, context: ArrayView1<f32>) -> Result<usize> {
        check_context(self.context_dim, context)?;
        if let Some(action) = self.warm_up.next_round() {
            return Ok(action);
        }

        let predicted = self.model.predict(context)?;
        first_max(predicted.iter().copied()).ok_or_else(|| TycheError::Training("model predicted no actions".to_string()))
    }

    fn update_params(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        check_context(self.context_dim, context)?;
        check_action(self.n_actions, action)?;

        self.db.add(context, action, reward)?;
        self.update_count += 1;
        if self.update_count % self.config.nn_update_interval == 0 {
            let loss = self.model.train(&self.db, self.config.train_epochs, self.config.batch_size)?;
            debug!(update = self.update_count, ?loss, "neural greedy model retrained");
        }
        Ok(())
    }
}
