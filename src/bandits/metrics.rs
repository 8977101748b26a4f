use serde::{Deserialize, Serialize};

/// Reward and regret bookkeeping for a contextual bandit.
///
/// `cum_*_hist[i]` is always the running sum of `*_hist[0..=i]`, and all four
/// histories have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BanditMetrics {
    pub reward_hist: Vec<f32>,
    pub regret_hist: Vec<f32>,
    pub cum_reward_hist: Vec<f32>,
    pub cum_regret_hist: Vec<f32>,
    pub cum_reward: f32,
    pub cum_regret: f32,
}

impl BanditMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round
    pub fn record(&mut self, reward: f32, max_reward: f32) {
        let regret = max_reward - reward;

        self.cum_regret += regret;
        self.cum_regret_hist.push(self.cum_regret);
        self.regret_hist.push(regret);

        self.cum_reward += reward;
        self.cum_reward_hist.push(self.cum_reward);
        self.reward_hist.push(reward);
    }

    /// Clear all metrics
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of recorded rounds
    pub fn len(&self) -> usize {
        self.reward_hist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reward_hist.is_empty()
    }

    /// Mean reward over the last `window` rounds
    pub fn avg_reward(&self, window: usize) -> Option<f32> {
        if self.reward_hist.is_empty() || window == 0 {
            return None;
        }

        let n = window.min(self.reward_hist.len());
        let sum: f32 = self.reward_hist.iter().rev().take(n).sum();
        Some(sum / n as f32)
    }

    /// Save metrics to file
    pub fn save(&self, path: &str) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics from file
    pub fn load(path: &str) -> crate::error::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
