//! # Tyche - Deep Contextual Bandits
//!
//! Tyche is a Rust library for contextual bandit experiments. It pairs
//! simulated bandit environments with agents that learn which arm to pull
//! from the context they observe, and tracks reward and regret as they go.
//!
//! ## Key Features
//!
//! - **Environments**: Bernoulli and Gaussian contextual bandits with one-hot or
//!   index contexts
//! - **Agents**: Bayesian linear Thompson sampling, greedy neural, and
//!   bootstrapped neural ensembles
//! - **Reward Models**: small feed-forward networks with Adam/SGD, gradient
//!   clipping, learning rate decay and dropout
//! - **Reproducibility**: every random draw comes from an explicit, seedable
//!   [`exec::ExecContext`]
//! - **Logging**: CSV, console and time-series metric sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use tyche::agents::LinearPosteriorAgent;
//! use tyche::bandits::{BanditEnv, BernoulliCB, ContextType};
//! use tyche::exec::ExecContext;
//! use tyche::trainer::DcbTrainer;
//!
//! let exec = ExecContext::seeded(42);
//! let bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &exec).unwrap();
//! let agent = LinearPosteriorAgent::builder(bandit.context_dim(), bandit.n_actions())
//!     .exec(exec)
//!     .build()
//!     .unwrap();
//!
//! let summary = DcbTrainer::new(bandit, agent).unwrap().train(100).unwrap();
//! assert_eq!(summary.regret_history.len(), 100);
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions
//! - [`agents`] - Contextual bandit agents and the [`agents::DcbAgent`] trait
//! - [`bandits`] - Contextual bandit environments and their metrics
//! - [`config`] - Serializable experiment configuration
//! - [`db`] - Transition storage with per-action queries
//! - [`error`] - Error types and result handling
//! - [`exec`] - Seedable execution context
//! - [`layers`] - Dense and dropout layers
//! - [`logger`] - Metric sinks
//! - [`loss`] - Loss functions for training
//! - [`model`] - Neural reward models
//! - [`network`] - Feed-forward network with masked regression training
//! - [`optimizer`] - Optimizers, gradient clipping and learning rate schedules
//! - [`trainer`] - The environment/agent interaction loop

pub mod activations;
pub mod agents;
pub mod bandits;
pub mod config;
pub mod db;
pub mod error;
pub mod exec;
pub mod layers;
pub mod logger;
pub mod loss;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod trainer;

pub use error::{Result, TycheError};

#[cfg(test)]
mod tests;
