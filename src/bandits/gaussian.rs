use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::{ContextType, ContextualBandit, RewardModel};
use crate::error::Result;
use crate::exec::ExecContext;

/// Unit-variance Gaussian rewards indexed by `(bandit, arm)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianRewards {
    pub reward_means: Array2<f32>,
}

impl GaussianRewards {
    pub fn new(reward_means: Array2<f32>) -> Self {
        GaussianRewards { reward_means }
    }

    /// Means drawn uniformly from `[0, 1)`
    pub fn random<R: Rng + ?Sized>(bandits: usize, arms: usize, rng: &mut R) -> Self {
        Self::new(Array2::random_using((bandits, arms), Uniform::new(0.0, 1.0), rng))
    }

    /// Largest mean across the arms of `bandit`
    pub fn max_mean(&self, bandit: usize) -> f32 {
        self.reward_means
            .row(bandit)
            .iter()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b))
    }
}

impl RewardModel for GaussianRewards {
    fn shape(&self) -> (usize, usize) {
        self.reward_means.dim()
    }

    fn compute_reward<R: Rng + ?Sized>(&self, bandit: usize, action: usize, rng: &mut R) -> (f32, f32) {
        let noise: f32 = StandardNormal.sample(rng);
        let reward = self.reward_means[[bandit, action]] + noise;
        (reward, self.max_mean(bandit))
    }
}

/// Contextual bandit with categorical context and Gaussian rewards
pub type GaussianCB = ContextualBandit<GaussianRewards>;

impl ContextualBandit<GaussianRewards> {
    /// Create a Gaussian bandit, drawing random means when `reward_means` is
    /// `None`.
    pub fn gaussian(
        bandits: usize,
        arms: usize,
        reward_means: Option<Array2<f32>>,
        context_type: ContextType,
        exec: &ExecContext,
    ) -> Result<Self> {
        Self::with_table(bandits, arms, context_type, exec, |rng| match reward_means {
            Some(means) => GaussianRewards::new(means),
            None => GaussianRewards::random(bandits, arms, rng),
        })
    }
}
