use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_action, check_context, check_dims, first_max, DcbAgent, WarmUp};
use crate::db::TransitionDb;
use crate::error::{Result, TycheError};
use crate::exec::{streams, ExecContext};
use crate::model::{BanditModel, ModelConfig, NeuralBanditModel};

/// Hyperparameters of a [`BootstrapNeuralAgent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub init_pulls: usize,
    pub model: ModelConfig,
    /// Sample actions with dropout active in the chosen member
    pub eval_with_dropout: bool,
    /// Ensemble size
    pub n: usize,
    /// Probability that a member's store receives a given transition
    pub add_prob: f64,
    pub train_epochs: usize,
    pub batch_size: usize,
    pub nn_update_interval: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            init_pulls: 3,
            model: ModelConfig {
                hidden_dims: vec![50, 50],
                lr: 0.1,
                lr_decay: 0.5,
                lr_reset: true,
                max_grad_norm: Some(0.5),
                dropout_p: None,
                ..ModelConfig::default()
            },
            eval_with_dropout: false,
            n: 10,
            add_prob: 0.95,
            train_epochs: 20,
            batch_size: 512,
            nn_update_interval: 1,
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if self.n == 0 {
            return Err(TycheError::invalid_parameter("n", "ensemble needs at least one member"));
        }
        if !(0.0..=1.0).contains(&self.add_prob) {
            return Err(TycheError::invalid_parameter(
                "add_prob".to_string(),
                format!("must be in [0, 1], found {}", self.add_prob),
            ));
        }
        if self.batch_size == 0 {
            return Err(TycheError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if self.nn_update_interval == 0 {
            return Err(TycheError::invalid_parameter("nn_update_interval", "must be at least 1"));
        }
        Ok(())
    }
}

/// Ensemble of reward models, each trained on its own bootstrapped store.
///
/// Every round one member is chosen uniformly and played greedily, so the
/// disagreement between members drives exploration.
#[derive(Debug, Clone)]
pub struct BootstrapNeuralAgent<M: BanditModel = NeuralBanditModel> {
    context_dim: usize,
    n_actions: usize,
    config: BootstrapConfig,
    models: Vec<M>,
    dbs: Vec<TransitionDb>,
    warm_up: WarmUp,
    update_count: usize,
    rng: StdRng,
}

impl BootstrapNeuralAgent<NeuralBanditModel> {
    pub fn new(context_dim: usize, n_actions: usize, config: BootstrapConfig, exec: &ExecContext) -> Result<Self> {
        check_dims(context_dim, n_actions)?;
        config.validate()?;
        let models = (0..config.n as u64)
            .map(|member| NeuralBanditModel::new(context_dim, n_actions, &config.model, exec, member))
            .collect::<Result<Vec<_>>>()?;
        Self::with_models(context_dim, n_actions, models, config, exec)
    }
}

impl<M: BanditModel> BootstrapNeuralAgent<M> {
    /// Build the ensemble from existing models; `config.n` is taken from
    /// `models.len()`.
    pub fn with_models(
        context_dim: usize,
        n_actions: usize,
        models: Vec<M>,
        mut config: BootstrapConfig,
        exec: &ExecContext,
    ) -> Result<Self> {
        check_dims(context_dim, n_actions)?;
        config.n = models.len();
        config.validate()?;

        Ok(BootstrapNeuralAgent {
            context_dim,
            n_actions,
            dbs: vec![TransitionDb::new(context_dim, n_actions); models.len()],
            models,
            warm_up: WarmUp::new(n_actions, config.init_pulls)?,
            update_count: 0,
            rng: exec.rng(streams::AGENT),
            config,
        })
    }

    /// Offer a transition to every member's store.
    ///
    /// Each store keeps it with probability `add_prob`, except while
    /// `update_count <= 1` when every store keeps it.
    pub fn update_db(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        let add_prob = self.config.add_prob;
        for db in &mut self.dbs {
            if self.update_count <= 1 || self.rng.gen::<f64>() < add_prob {
                db.add(context, action, reward)?;
            }
        }
        Ok(())
    }

    pub fn n_members(&self) -> usize {
        self.models.len()
    }

    pub fn models(&self) -> &[M] {
        &self.models
    }

    /// Store of ensemble member `member`
    pub fn member_db(&self, member: usize) -> Option<&TransitionDb> {
        self.dbs.get(member)
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }
}

impl<M: BanditModel> DcbAgent for BootstrapNeuralAgent<M> {
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

        let member = self.rng.gen_range(0..self.models.len());
        let model = &mut self.models[member];
        model.set_use_dropout(self.config.eval_with_dropout);
        let predicted = model.predict(context)?;
        first_max(predicted.iter().copied()).ok_or_else(|| TycheError::Training("model predicted no actions".to_string()))
    }

    fn update_params(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        check_context(self.context_dim, context)?;
        check_action(self.n_actions, action)?;

        self.update_count += 1;
        self.update_db(context, action, reward)?;

        if self.update_count % self.config.nn_update_interval == 0 {
            let (epochs, batch_size) = (self.config.train_epochs, self.config.batch_size);
            for (member, (model, db)) in self.models.iter_mut().zip(&self.dbs).enumerate() {
                let loss = model.train(db, epochs, batch_size)?;
                debug!(member, samples = db.len(), ?loss, "ensemble member retrained");
            }
        }
        Ok(())
    }
}
