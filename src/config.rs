//! Experiment configuration.
//!
//! An [`ExperimentConfig`] describes a whole run: which bandit to build, which
//! agent to train on it, for how long, and where to log. It is usually loaded
//! from JSON:
//!
//! ```json
//! {
//!   "seed": 42,
//!   "timesteps": 500,
//!   "log_interval": 50,
//!   "bandit": { "kind": "bernoulli", "bandits": 2, "arms": 3, "context_type": "tensor" },
//!   "agent": { "type": "linear_posterior", "init_pulls": 2 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::agents::{
    BootstrapConfig, BootstrapNeuralAgent, DcbAgent, LinearPosteriorAgent, LinearPosteriorConfig, NeuralGreedyAgent,
    NeuralGreedyConfig,
};
use crate::bandits::{BanditEnv, BernoulliCB, ContextType, GaussianCB};
use crate::error::{Result, TycheError};
use crate::exec::ExecContext;
use crate::logger::{LogFormat, Logger};

/// Reward family of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanditKind {
    #[default]
    Bernoulli,
    Gaussian,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanditConfig {
    pub kind: BanditKind,
    pub bandits: usize,
    pub arms: usize,
    /// `"tensor"` (one-hot) or `"int"` (bandit index)
    pub context_type: String,
    /// `bandits x arms` probabilities or means; random when absent
    pub table: Option<Vec<Vec<f32>>>,
}

impl Default for BanditConfig {
    fn default() -> Self {
        BanditConfig {
            kind: BanditKind::Bernoulli,
            bandits: 10,
            arms: 5,
            context_type: ContextType::OneHot.to_string(),
            table: None,
        }
    }
}

impl BanditConfig {
    pub fn context_type(&self) -> Result<ContextType> {
        self.context_type.parse()
    }

    fn table(&self) -> Result<Option<Array2<f32>>> {
        let rows = match &self.table {
            Some(rows) => rows,
            None => return Ok(None),
        };
        if rows.len() != self.bandits || rows.iter().any(|row| row.len() != self.arms) {
            return Err(TycheError::dimension_mismatch(
                format!("table of {} rows with {} arms each", self.bandits, self.arms),
                format!("table with row lengths {:?}", rows.iter().map(Vec::len).collect::<Vec<_>>()),
            ));
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.bandits, self.arms), flat)
            .map(Some)
            .map_err(|e| TycheError::invalid_parameter("table".to_string(), e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.bandits == 0 {
            return Err(TycheError::invalid_parameter("bandits", "must be at least 1"));
        }
        if self.arms == 0 {
            return Err(TycheError::invalid_parameter("arms", "must be at least 1"));
        }
        self.context_type()?;
        self.table()?;
        Ok(())
    }

    /// Build the environment
    pub fn build(&self, exec: &ExecContext) -> Result<Box<dyn BanditEnv>> {
        let context_type = self.context_type()?;
        let table = self.table()?;
        let env: Box<dyn BanditEnv> = match self.kind {
            BanditKind::Bernoulli => Box::new(BernoulliCB::bernoulli(self.bandits, self.arms, table, context_type, exec)?),
            BanditKind::Gaussian => Box::new(GaussianCB::gaussian(self.bandits, self.arms, table, context_type, exec)?),
        };
        Ok(env)
    }
}

/// Agent variant and its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentConfig {
    LinearPosterior(LinearPosteriorConfig),
    NeuralGreedy(NeuralGreedyConfig),
    Bootstrap(BootstrapConfig),
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::LinearPosterior(LinearPosteriorConfig::default())
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            AgentConfig::LinearPosterior(c) => c.validate(),
            AgentConfig::NeuralGreedy(c) => c.validate(),
            AgentConfig::Bootstrap(c) => c.validate(),
        }
    }

    /// Build the agent for an environment of the given shape
    pub fn build(&self, context_dim: usize, n_actions: usize, exec: &ExecContext) -> Result<Box<dyn DcbAgent>> {
        let agent: Box<dyn DcbAgent> = match self {
            AgentConfig::LinearPosterior(c) => {
                Box::new(LinearPosteriorAgent::new(context_dim, n_actions, c.clone(), exec)?)
            }
            AgentConfig::NeuralGreedy(c) => Box::new(NeuralGreedyAgent::new(context_dim, n_actions, c.clone(), exec)?),
            AgentConfig::Bootstrap(c) => Box::new(BootstrapNeuralAgent::new(context_dim, n_actions, c.clone(), exec)?),
        };
        Ok(agent)
    }
}

/// A complete training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Master seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    pub timesteps: usize,
    /// Log every n rounds, `0` disables logging
    pub log_interval: usize,
    /// Directory for log files; nothing is written when absent
    pub log_dir: Option<PathBuf>,
    /// Sink names: `csv`, `stdout`, `scalars`
    pub log_formats: Vec<String>,
    pub bandit: BanditConfig,
    pub agent: AgentConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            seed: None,
            timesteps: 1000,
            log_interval: 100,
            log_dir: None,
            log_formats: vec!["csv".to_string()],
            bandit: BanditConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.bandit.validate()?;
        self.agent.validate()?;
        self.log_formats()?;
        Ok(())
    }

    pub fn exec(&self) -> ExecContext {
        ExecContext { seed: self.seed }
    }

    pub fn log_formats(&self) -> Result<Vec<LogFormat>> {
        self.log_formats.iter().map(|name| name.parse()).collect()
    }

    /// Open the configured sinks, or a disabled logger without `log_dir`
    pub fn logger(&self) -> Result<Logger> {
        match &self.log_dir {
            Some(dir) => Logger::new(dir, &self.log_formats()?),
            None => Ok(Logger::disabled()),
        }
    }
}
