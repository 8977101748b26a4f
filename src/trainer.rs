//! Interaction loop between a bandit environment and an agent.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::DcbAgent;
use crate::bandits::BanditEnv;
use crate::config::ExperimentConfig;
use crate::error::{Result, TycheError};
use crate::logger::{Logger, Record};

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub timesteps: usize,
    pub cumulative_reward: f32,
    pub cumulative_regret: f32,
    pub mean_reward: f32,
    /// Cumulative regret after every round
    pub regret_history: Vec<f32>,
}

/// Runs `select -> step -> update` rounds and logs progress.
pub struct DcbTrainer<E, A> {
    env: E,
    agent: A,
    logger: Logger,
    log_interval: usize,
}

impl<E: BanditEnv, A: DcbAgent> DcbTrainer<E, A> {
    pub fn new(env: E, agent: A) -> Result<Self> {
        if env.n_actions() != agent.n_actions() {
            return Err(TycheError::dimension_mismatch(
                format!("{} actions", env.n_actions()),
                format!("{} actions", agent.n_actions()),
            ));
        }
        if env.context_dim() != agent.context_dim() {
            return Err(TycheError::dimension_mismatch(
                format!("context of length {}", env.context_dim()),
                format!("context of length {}", agent.context_dim()),
            ));
        }

        Ok(DcbTrainer {
            env,
            agent,
            logger: Logger::disabled(),
            log_interval: 100,
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Log every `log_interval` rounds; `0` disables logging
    pub fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }

    /// Reset the environment and play `timesteps` rounds.
    pub fn train(&mut self, timesteps: usize) -> Result<TrainingSummary> {
        let mut context = self.env.reset();

        for t in 1..=timesteps {
            let action = self.agent.select_action(context.view())?;
            let (next_context, reward) = self.env.step(action)?;
            self.agent.update_params(context.view(), action, reward)?;
            context = next_context;

            if self.log_interval > 0 && t % self.log_interval == 0 {
                self.log(t)?;
            }
        }
        self.logger.close()?;

        let metrics = self.env.metrics();
        let mean_reward = if metrics.is_empty() {
            0.0
        } else {
            metrics.cum_reward / metrics.len() as f32
        };
        info!(
            timesteps,
            cumulative_reward = metrics.cum_reward,
            cumulative_regret = metrics.cum_regret,
            "training finished"
        );

        Ok(TrainingSummary {
            timesteps,
            cumulative_reward: metrics.cum_reward,
            cumulative_regret: metrics.cum_regret,
            mean_reward,
            regret_history: metrics.cum_regret_hist.clone(),
        })
    }

    fn log(&mut self, timestep: usize) -> Result<()> {
        let metrics = self.env.metrics();
        let last = |hist: &[f32]| hist.last().copied().unwrap_or(0.0) as f64;
        let record = Record::new()
            .with("timestep", timestep as f64)
            .with("reward", last(&metrics.reward_hist))
            .with("regret", last(&metrics.regret_hist))
            .with("cumulative_reward", metrics.cum_reward as f64)
            .with("cumulative_regret", metrics.cum_regret as f64);
        self.logger.write(&record)
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn into_parts(self) -> (E, A) {
        (self.env, self.agent)
    }
}

/// Build the bandit, agent and logger described by `config` and train.
pub fn run_experiment(config: &ExperimentConfig) -> Result<TrainingSummary> {
    config.validate()?;
    let exec = config.exec();

    let env = config.bandit.build(&exec)?;
    let agent = config.agent.build(env.context_dim(), env.n_actions(), &exec)?;
    info!(
        bandits = config.bandit.bandits,
        arms = config.bandit.arms,
        timesteps = config.timesteps,
        "starting experiment"
    );

    DcbTrainer::new(env, agent)?
        .with_logger(config.logger()?)
        .with_log_interval(config.log_interval)
        .train(config.timesteps)
}
