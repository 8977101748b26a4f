use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::posterior::ActionPosterior;
use super::{check_action, check_context, check_dims, first_max, DcbAgent, WarmUp};
use crate::db::TransitionDb;
use crate::error::{Result, TycheError};
use crate::exec::{streams, ExecContext};

/// Hyperparameters of a [`LinearPosteriorAgent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearPosteriorConfig {
    /// Round-robin pulls per action before sampling starts
    pub init_pulls: usize,
    /// Precision of the Gaussian weight prior
    pub lambda_prior: f64,
    /// Inverse-Gamma prior shape
    pub a0: f64,
    /// Inverse-Gamma prior scale
    pub b0: f64,
    /// Refit the posterior on every n-th update
    pub bayesian_update_interval: usize,
}

impl Default for LinearPosteriorConfig {
    fn default() -> Self {
        LinearPosteriorConfig {
            init_pulls: 3,
            lambda_prior: 0.25,
            a0: 6.0,
            b0: 6.0,
            bayesian_update_interval: 1,
        }
    }
}

impl LinearPosteriorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda_prior.is_finite() && self.lambda_prior > 0.0) {
            return Err(TycheError::invalid_parameter(
                "lambda_prior".to_string(),
                format!("must be positive, found {}", self.lambda_prior),
            ));
        }
        if !(self.a0.is_finite() && self.a0 > 0.0) {
            return Err(TycheError::invalid_parameter("a0".to_string(), format!("must be positive, found {}", self.a0)));
        }
        if !(self.b0.is_finite() && self.b0 > 0.0) {
            return Err(TycheError::invalid_parameter("b0".to_string(), format!("must be positive, found {}", self.b0)));
        }
        if self.bayesian_update_interval == 0 {
            return Err(TycheError::invalid_parameter("bayesian_update_interval", "must be at least 1"));
        }
        Ok(())
    }
}

/// Thompson sampling with an independent Bayesian linear regression per action.
///
/// Each action keeps a Normal-Inverse-Gamma posterior over the weights of
/// `reward = w . [context; 1] + noise`. After warm-up every round draws one
/// weight vector per action and plays the action with the largest sampled
/// value. Posteriors are refit from all of the action's data rather than
/// updated incrementally.
#[derive(Debug, Clone)]
pub struct LinearPosteriorAgent {
    context_dim: usize,
    n_actions: usize,
    config: LinearPosteriorConfig,
    db: TransitionDb,
    posteriors: Vec<ActionPosterior>,
    warm_up: WarmUp,
    update_count: usize,
    rng: StdRng,
}

impl LinearPosteriorAgent {
    pub fn new(context_dim: usize, n_actions: usize, config: LinearPosteriorConfig, exec: &ExecContext) -> Result<Self> {
        check_dims(context_dim, n_actions)?;
        config.validate()?;

        let prior = ActionPosterior::prior(context_dim + 1, config.lambda_prior, config.a0, config.b0);
        Ok(LinearPosteriorAgent {
            context_dim,
            n_actions,
            db: TransitionDb::new(context_dim, n_actions),
            posteriors: vec![prior; n_actions],
            warm_up: WarmUp::new(n_actions, config.init_pulls)?,
            update_count: 0,
            rng: exec.rng(streams::AGENT),
            config,
        })
    }

    pub fn builder(context_dim: usize, n_actions: usize) -> LinearPosteriorAgentBuilder {
        LinearPosteriorAgentBuilder::new(context_dim, n_actions)
    }

    /// Current posterior of `action`
    pub fn posterior(&self, action: usize) -> Option<&ActionPosterior> {
        self.posteriors.get(action)
    }

    /// Replace the posterior of `action`, e.g. to warm-start from earlier runs
    pub fn set_posterior(&mut self, action: usize, posterior: ActionPosterior) -> Result<()> {
        check_action(self.n_actions, action)?;
        if posterior.dim() != self.context_dim + 1 {
            return Err(TycheError::dimension_mismatch(
                format!("posterior of dimension {}", self.context_dim + 1),
                format!("posterior of dimension {}", posterior.dim()),
            ));
        }
        self.posteriors[action] = posterior;
        Ok(())
    }

    pub fn config(&self) -> &LinearPosteriorConfig {
        &self.config
    }

    pub fn db(&self) -> &TransitionDb {
        &self.db
    }

    pub fn rounds(&self) -> usize {
        self.warm_up.rounds()
    }

    pub fn update_count(&self) -> usize {
        self.update_count
    }

    fn refit(&mut self, action: usize) {
        let (contexts, rewards) = self.db.get_data_for_action(action);
        let (k, d) = contexts.dim();
        let x = DMatrix::from_fn(k, d + 1, |i, j| if j < d { f64::from(contexts[[i, j]]) } else { 1.0 });
        let y = DVector::from_fn(k, |i, _| f64::from(rewards[[i, 0]]));

        let c = &self.config;
        let t = self.warm_up.rounds();
        if !self.posteriors[action].refit(&x, &y, c.lambda_prior, c.a0, c.b0, t) {
            debug!(action, samples = k, "posterior refit skipped, keeping previous posterior");
        }
    }
}

impl DcbAgent for LinearPosteriorAgent {
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

        let x = DVector::from_iterator(
            self.context_dim + 1,
            context.iter().map(|&v| f64::from(v)).chain(std::iter::once(1.0)),
        );

        let mut values = Vec::with_capacity(self.n_actions);
        for (action, posterior) in self.posteriors.iter().enumerate() {
            let draw = posterior.sample(&mut self.rng);
            if draw.is_degenerate() {
                debug!(action, "posterior not sampleable, using standard normal weights");
            }
            values.push(draw.weights().dot(&x));
        }

        first_max(values).ok_or_else(|| TycheError::Training("no action values".to_string()))
    }

    fn update_params(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        check_context(self.context_dim, context)?;
        check_action(self.n_actions, action)?;

        self.db.add(context, action, reward)?;
        self.update_count += 1;
        if self.update_count % self.config.bayesian_update_interval == 0 {
            self.refit(action);
        }
        Ok(())
    }
}

/// Builder for [`LinearPosteriorAgent`]
pub struct LinearPosteriorAgentBuilder {
    context_dim: usize,
    n_actions: usize,
    config: LinearPosteriorConfig,
    exec: ExecContext,
}

impl LinearPosteriorAgentBuilder {
    pub fn new(context_dim: usize, n_actions: usize) -> Self {
        LinearPosteriorAgentBuilder {
            context_dim,
            n_actions,
            config: LinearPosteriorConfig::default(),
            exec: ExecContext::default(),
        }
    }

    /// Replace every hyperparameter at once
    pub fn config(mut self, config: LinearPosteriorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn init_pulls(mut self, init_pulls: usize) -> Self {
        self.config.init_pulls = init_pulls;
        self
    }

    pub fn lambda_prior(mut self, lambda_prior: f64) -> Self {
        self.config.lambda_prior = lambda_prior;
        self
    }

    pub fn a0(mut self, a0: f64) -> Self {
        self.config.a0 = a0;
        self
    }

    pub fn b0(mut self, b0: f64) -> Self {
        self.config.b0 = b0;
        self
    }

    pub fn bayesian_update_interval(mut self, interval: usize) -> Self {
        self.config.bayesian_update_interval = interval;
        self
    }

    pub fn exec(mut self, exec: ExecContext) -> Self {
        self.exec = exec;
        self
    }

    pub fn build(self) -> Result<LinearPosteriorAgent> {
        LinearPosteriorAgent::new(self.context_dim, self.n_actions, self.config, &self.exec)
    }
}
