use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::Rng;

use crate::error::{Result, TycheError};

/// A single observed `(context, action, reward)` triple.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub context: Array1<f32>,
    pub action: usize,
    pub reward: f32,
}

/// A mini-batch drawn from a [`TransitionDb`], rows aligned across fields.
#[derive(Clone, Debug)]
pub struct Batch {
    pub contexts: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Append-only transition store with per-action indexing.
///
/// Transitions are kept in one global insertion-ordered sequence; each action
/// keeps the positions of its own transitions so that querying by action is
/// order-preserving and never copies unrelated rows.
#[derive(Clone, Debug)]
pub struct TransitionDb {
    context_dim: usize,
    n_actions: usize,
    transitions: Vec<Transition>,
    by_action: Vec<Vec<usize>>,
}

impl TransitionDb {
    pub fn new(context_dim: usize, n_actions: usize) -> Self {
        TransitionDb {
            context_dim,
            n_actions,
            transitions: Vec::new(),
            by_action: vec![Vec::new(); n_actions],
        }
    }

    /// Append a transition.
    pub fn add(&mut self, context: ArrayView1<f32>, action: usize, reward: f32) -> Result<()> {
        if context.len() != self.context_dim {
            return Err(TycheError::dimension_mismatch(
                format!("context of length {}", self.context_dim),
                format!("context of length {}", context.len()),
            ));
        }
        if action >= self.n_actions {
            return Err(TycheError::InvalidAction {
                action,
                max_actions: self.n_actions,
            });
        }

        self.by_action[action].push(self.transitions.len());
        self.transitions.push(Transition {
            context: context.to_owned(),
            action,
            reward,
        });
        Ok(())
    }

    /// All contexts and rewards recorded under `action`, in insertion order.
    ///
    /// Contexts come back as a `(k, context_dim)` matrix and rewards as a
    /// `(k, 1)` column. An action with no data yields `k == 0`.
    pub fn get_data_for_action(&self, action: usize) -> (Array2<f32>, Array2<f32>) {
        let rows: &[usize] = self.by_action.get(action).map(Vec::as_slice).unwrap_or(&[]);
        let contexts = Array2::from_shape_fn((rows.len(), self.context_dim), |(i, j)| {
            self.transitions[rows[i]].context[j]
        });
        let rewards = Array2::from_shape_fn((rows.len(), 1), |(i, _)| self.transitions[rows[i]].reward);
        (contexts, rewards)
    }

    /// Draw a uniform mini-batch without replacement.
    ///
    /// `None` (or a size at least `len()`) returns every transition in
    /// insertion order.
    pub fn get_data<R: Rng + ?Sized>(&self, batch_size: Option<usize>, rng: &mut R) -> Result<Batch> {
        if self.transitions.is_empty() {
            return Err(TycheError::EmptyBuffer("No transitions recorded".to_string()));
        }

        let rows: Vec<usize> = match batch_size {
            Some(size) if size < self.transitions.len() => {
                index::sample(rng, self.transitions.len(), size).into_vec()
            }
            _ => (0..self.transitions.len()).collect(),
        };

        let contexts = Array2::from_shape_fn((rows.len(), self.context_dim), |(i, j)| {
            self.transitions[rows[i]].context[j]
        });
        let actions = rows.iter().map(|&i| self.transitions[i].action).collect();
        let rewards = rows.iter().map(|&i| self.transitions[i].reward).collect();

        Ok(Batch {
            contexts,
            actions,
            rewards,
        })
    }

    /// Number of transitions recorded under `action`
    pub fn count_for_action(&self, action: usize) -> usize {
        self.by_action.get(action).map_or(0, Vec::len)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn context_dim(&self) -> usize {
        self.context_dim
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
