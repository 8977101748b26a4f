//! # Contextual Bandit Environments
//!
//! A contextual bandit holds several independent bandits that share one arm
//! set. Each round one bandit is drawn uniformly at random and exposed to the
//! agent as a context; the agent picks an arm, the environment scores it and
//! records reward and regret, then draws the next bandit.
//!
//! ## Available Environments
//!
//! - **BernoulliCB**: 0/1 rewards, `max_reward` is always 1
//! - **GaussianCB**: unit-variance Normal rewards around a per-arm mean,
//!   `max_reward` is the best mean of the current bandit
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tyche::bandits::{BanditEnv, BernoulliCB, ContextType};
//! use tyche::exec::ExecContext;
//!
//! let mut bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &ExecContext::seeded(0)).unwrap();
//! let context = bandit.reset();
//! let (next_context, reward) = bandit.step(1).unwrap();
//! ```

mod bernoulli;
mod gaussian;
mod metrics;

pub use bernoulli::{BernoulliCB, BernoulliRewards};
pub use gaussian::{GaussianCB, GaussianRewards};
pub use metrics::BanditMetrics;

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TycheError};
use crate::exec::{streams, ExecContext};

/// How the current bandit is presented to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextType {
    /// One-hot vector over bandits, `context_dim == bandits`
    #[default]
    #[serde(rename = "tensor")]
    OneHot,
    /// The bandit index as a one-element vector, `context_dim == 1`
    #[serde(rename = "int")]
    Index,
}

impl FromStr for ContextType {
    type Err = TycheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tensor" => Ok(ContextType::OneHot),
            "int" => Ok(ContextType::Index),
            other => Err(TycheError::UnsupportedContextType(other.to_string())),
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::OneHot => write!(f, "tensor"),
            ContextType::Index => write!(f, "int"),
        }
    }
}

/// Reward distribution of a bandit family
pub trait RewardModel {
    /// `(bandits, arms)` shape of the parameter table
    fn shape(&self) -> (usize, usize);

    /// Sample `(reward, max_reward)` for pulling `action` on `bandit`
    fn compute_reward<R: Rng + ?Sized>(&self, bandit: usize, action: usize, rng: &mut R) -> (f32, f32);
}

/// Environment interface consumed by agents and the trainer
pub trait BanditEnv {
    fn n_actions(&self) -> usize;

    fn context_dim(&self) -> usize;

    /// Clear metrics, draw a fresh bandit and return its context
    fn reset(&mut self) -> Array1<f32>;

    /// Score `action` and return the context for the next round with the reward
    fn step(&mut self, action: usize) -> Result<(Array1<f32>, f32)>;

    fn metrics(&self) -> &BanditMetrics;
}

/// Shared state machine of every contextual bandit.
///
/// After construction and after every `reset`/`step` there is a current
/// context waiting for an action.
#[derive(Debug, Clone)]
pub struct ContextualBandit<M> {
    n_bandits: usize,
    n_arms: usize,
    context_type: ContextType,
    reward_model: M,
    metrics: BanditMetrics,
    curr_bandit: usize,
    curr_context: Array1<f32>,
    rng: StdRng,
}

impl<M: RewardModel> ContextualBandit<M> {
    /// Create a bandit around an existing reward model
    pub fn new(reward_model: M, context_type: ContextType, exec: &ExecContext) -> Result<Self> {
        let (bandits, arms) = reward_model.shape();
        Self::with_table(bandits, arms, context_type, exec, |_| reward_model)
    }

    /// Build the reward model from the bandit's own RNG, so a seeded context
    /// also fixes randomly drawn tables.
    pub(crate) fn with_table<F>(
        bandits: usize,
        arms: usize,
        context_type: ContextType,
        exec: &ExecContext,
        make_model: F,
    ) -> Result<Self>
    where
        F: FnOnce(&mut StdRng) -> M,
    {
        if bandits == 0 {
            return Err(TycheError::invalid_parameter("bandits", "must be at least 1"));
        }
        if arms == 0 {
            return Err(TycheError::invalid_parameter("arms", "must be at least 1"));
        }

        let mut rng = exec.rng(streams::BANDIT);
        let reward_model = make_model(&mut rng);
        let shape = reward_model.shape();
        if shape != (bandits, arms) {
            return Err(TycheError::dimension_mismatch(
                format!("reward table of shape ({}, {})", bandits, arms),
                format!("reward table of shape ({}, {})", shape.0, shape.1),
            ));
        }

        let mut bandit = ContextualBandit {
            n_bandits: bandits,
            n_arms: arms,
            context_type,
            reward_model,
            metrics: BanditMetrics::new(),
            curr_bandit: 0,
            curr_context: Array1::zeros(0),
            rng,
        };
        bandit.reset_bandit();
        Ok(bandit)
    }

    fn reset_bandit(&mut self) {
        self.curr_bandit = self.rng.gen_range(0..self.n_bandits);
        self.curr_context = match self.context_type {
            ContextType::OneHot => {
                let mut one_hot = Array1::zeros(self.n_bandits);
                one_hot[self.curr_bandit] = 1.0;
                one_hot
            }
            ContextType::Index => Array1::from_elem(1, self.curr_bandit as f32),
        };
    }

    pub fn bandits(&self) -> usize {
        self.n_bandits
    }

    pub fn arms(&self) -> usize {
        self.n_arms
    }

    pub fn context_type(&self) -> ContextType {
        self.context_type
    }

    pub fn current_bandit(&self) -> usize {
        self.curr_bandit
    }

    pub fn current_context(&self) -> &Array1<f32> {
        &self.curr_context
    }

    pub fn reward_model(&self) -> &M {
        &self.reward_model
    }
}

impl<M: RewardModel> BanditEnv for ContextualBandit<M> {
    fn n_actions(&self) -> usize {
        self.n_arms
    }

    fn context_dim(&self) -> usize {
        match self.context_type {
            ContextType::OneHot => self.n_bandits,
            ContextType::Index => 1,
        }
    }

    fn reset(&mut self) -> Array1<f32> {
        self.metrics.clear();
        self.reset_bandit();
        self.curr_context.clone()
    }

    fn step(&mut self, action: usize) -> Result<(Array1<f32>, f32)> {
        if action >= self.n_arms {
            return Err(TycheError::InvalidAction {
                action,
                max_actions: self.n_arms,
            });
        }

        let (reward, max_reward) = self
            .reward_model
            .compute_reward(self.curr_bandit, action, &mut self.rng);
        self.metrics.record(reward, max_reward);
        self.reset_bandit();
        Ok((self.curr_context.clone(), reward))
    }

    fn metrics(&self) -> &BanditMetrics {
        &self.metrics
    }
}

impl<E: BanditEnv + ?Sized> BanditEnv for Box<E> {
    fn n_actions(&self) -> usize {
        (**self).n_actions()
    }

    fn context_dim(&self) -> usize {
        (**self).context_dim()
    }

    fn reset(&mut self) -> Array1<f32> {
        (**self).reset()
    }

    fn step(&mut self, action: usize) -> Result<(Array1<f32>, f32)> {
        (**self).step(action)
    }

    fn metrics(&self) -> &BanditMetrics {
        (**self).metrics()
    }
}
