use serde::{Serialize, Deserialize};

/// Learning rate scheduling strategies
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LearningRateScheduler {
    /// Constant learning rate
    Constant { lr: f32 },

    /// Inverse time decay: lr = initial_lr / (1 + decay_rate * step)
    InverseTimeDecay {
        initial_lr: f32,
        decay_rate: f32,
    },
}

impl LearningRateScheduler {
    /// Get the learning rate for a given step
    pub fn get_lr(&self, step: usize) -> f32 {
        match self {
            LearningRateScheduler::Constant { lr } => *lr,

            LearningRateScheduler::InverseTimeDecay { initial_lr, decay_rate } => {
                initial_lr / (1.0 + decay_rate * step as f32)
            }
        }
    }

    /// Create a constant learning rate scheduler
    pub fn constant(lr: f32) -> Self {
        LearningRateScheduler::Constant { lr }
    }

    /// Inverse time decay, or a constant rate when `decay_rate` is zero
    pub fn inverse_time(initial_lr: f32, decay_rate: f32) -> Self {
        if decay_rate == 0.0 {
            Self::constant(initial_lr)
        } else {
            LearningRateScheduler::InverseTimeDecay {
                initial_lr,
                decay_rate,
            }
        }
    }
}
