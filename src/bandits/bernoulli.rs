use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ContextType, ContextualBandit, RewardModel};
use crate::error::Result;
use crate::exec::ExecContext;

/// Bernoulli rewards indexed by `(bandit, arm)`.
///
/// A round pays 1 when a uniform draw exceeds the configured probability, so
/// the table holds the probability of *no* reward. Experiments built on this
/// table depend on that convention; do not flip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BernoulliRewards {
    pub reward_probs: Array2<f32>,
}

impl BernoulliRewards {
    pub fn new(reward_probs: Array2<f32>) -> Self {
        BernoulliRewards { reward_probs }
    }

    /// Probabilities drawn uniformly from `[0, 1)`
    pub fn random<R: Rng + ?Sized>(bandits: usize, arms: usize, rng: &mut R) -> Self {
        Self::new(Array2::random_using((bandits, arms), Uniform::new(0.0, 1.0), rng))
    }
}

impl RewardModel for BernoulliRewards {
    fn shape(&self) -> (usize, usize) {
        self.reward_probs.dim()
    }

    fn compute_reward<R: Rng + ?Sized>(&self, bandit: usize, action: usize, rng: &mut R) -> (f32, f32) {
        let reward_prob = self.reward_probs[[bandit, action]];
        let reward = if rng.gen::<f32>() > reward_prob { 1.0 } else { 0.0 };
        (reward, 1.0)
    }
}

/// Contextual bandit with categorical context and Bernoulli rewards
pub type BernoulliCB = ContextualBandit<BernoulliRewards>;

impl ContextualBandit<BernoulliRewards> {
    /// Create a Bernoulli bandit, drawing a random probability table when
    /// `reward_probs` is `None`.
    pub fn bernoulli(
        bandits: usize,
        arms: usize,
        reward_probs: Option<Array2<f32>>,
        context_type: ContextType,
        exec: &ExecContext,
    ) -> Result<Self> {
        Self::with_table(bandits, arms, context_type, exec, |rng| match reward_probs {
            Some(probs) => BernoulliRewards::new(probs),
            None => BernoulliRewards::random(bandits, arms, rng),
        })
    }
}
