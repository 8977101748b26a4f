//! # Deep Contextual Bandit Agents
//!
//! Every agent observes a context, chooses one of `n_actions` arms and learns
//! from the reward it receives. All variants start with a deterministic
//! warm-up that pulls each arm `init_pulls` times in round-robin order, then
//! switch to their own exploration policy:
//!
//! - **LinearPosteriorAgent**: Thompson sampling over a Bayesian linear
//!   regression per action
//! - **NeuralGreedyAgent**: greedy with respect to a single neural reward model
//! - **BootstrapNeuralAgent**: greedy with respect to a randomly chosen member
//!   of a bootstrapped ensemble
//!
//! ## Example Usage
//!
//! ```rust
//! use tyche::agents::{DcbAgent, LinearPosteriorAgent};
//! use tyche::exec::ExecContext;
//! use ndarray::array;
//!
//! let mut agent = LinearPosteriorAgent::builder(2, 3)
//!     .init_pulls(1)
//!     .exec(ExecContext::seeded(7))
//!     .build()
//!     .unwrap();
//!
//! let context = array![1.0, 0.0];
//! let action = agent.select_action(context.view()).unwrap();
//! assert_eq!(action, 0);
//! agent.update_params(context.view(), action, 1.0).unwrap();
//! ```

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TycheError};

mod bootstrap;
mod linpos;
mod neural_greedy;
pub mod posterior;

pub use bootstrap::{BootstrapConfig, BootstrapNeuralAgent};
pub use linpos::{LinearPosteriorAgent, LinearPosteriorAgentBuilder, LinearPosteriorConfig};
pub use neural_greedy::{NeuralGreedyAgent, NeuralGreedyConfig};
pub use posterior::{ActionPosterior, PosteriorDraw};

/// Common interface of every contextual bandit agent.
pub trait DcbAgent {
    fn n_actions(&self) -> usize;

    fn context_dim(&self) -> usize;

    /// Choose an arm for `context`
    fn select_action(&mut self, context: ArrayView1<f32>) -> Result<usize>;

    /// Learn from the reward received for `action` in `context`
    fn update_params(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()>;
}

impl<A: DcbAgent + ?Sized> DcbAgent for Box<A> {
    fn n_actions(&self) -> usize {
        (**self).n_actions()
    }

    fn context_dim(&self) -> usize {
        (**self).context_dim()
    }

    fn select_action(&mut self, context: ArrayView1<f32>) -> Result<usize> {
        (**self).select_action(context)
    }

    fn update_params(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        (**self).update_params(context, action, reward)
    }
}

/// Round counter driving the initial round-robin phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmUp {
    n_actions: usize,
    length: usize,
    rounds: usize,
}

impl WarmUp {
    /// Fails when `n_actions * init_pulls` does not fit in a `usize`.
    pub fn new(n_actions: usize, init_pulls: usize) -> Result<Self> {
        let length = n_actions.checked_mul(init_pulls).ok_or_else(|| {
            TycheError::invalid_parameter(
                "init_pulls".to_string(),
                format!("{} pulls for each of {} actions overflows the round counter", init_pulls, n_actions),
            )
        })?;
        Ok(WarmUp {
            n_actions,
            length,
            rounds: 0,
        })
    }

    /// Advance one round; yields the forced arm while warming up.
    pub fn next_round(&mut self) -> Option<usize> {
        let round = self.rounds;
        self.rounds = self.rounds.saturating_add(1);
        (round < self.length).then(|| round % self.n_actions)
    }

    /// Number of forced rounds, `n_actions * init_pulls`
    pub fn forced_rounds(&self) -> usize {
        self.length
    }

    /// Rounds played so far, warm-up included
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn is_warming_up(&self) -> bool {
        self.rounds < self.length
    }
}

/// Index of the first maximum. NaN never wins.
pub fn first_max<T: PartialOrd + Copy>(values: impl IntoIterator<Item = T>) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    let comparable = |x: T| x.partial_cmp(&x).is_some();
    for (i, v) in values.into_iter().enumerate() {
        let replace = match best {
            None => true,
            // a leading NaN is displaced by any comparable value
            Some((_, b)) => v > b || (!comparable(b) && comparable(v)),
        };
        if replace {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn check_dims(context_dim: usize, n_actions: usize) -> Result<()> {
    if context_dim == 0 {
        return Err(TycheError::invalid_parameter("context_dim", "must be positive"));
    }
    if n_actions == 0 {
        return Err(TycheError::invalid_parameter("n_actions", "must be positive"));
    }
    Ok(())
}

pub(crate) fn check_context(expected: usize, context: ArrayView1<f32>) -> Result<()> {
    if context.len() != expected {
        return Err(TycheError::dimension_mismatch(
            format!("context of length {}", expected),
            format!("context of length {}", context.len()),
        ));
    }
    Ok(())
}

pub(crate) fn check_action(n_actions: usize, action: usize) -> Result<()> {
    if action >= n_actions {
        return Err(TycheError::InvalidAction {
            action,
            max_actions: n_actions,
        });
    }
    Ok(())
}
