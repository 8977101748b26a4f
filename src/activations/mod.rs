//! # Activation Functions Module
//!
//! Element-wise non-linearities for the reward networks.
//!
//! - **ReLU**: `max(0, x)`, the default for hidden layers
//! - **Linear**: identity, used for the per-action reward head
//! - **Sigmoid**: `1 / (1 + e^(-x))`
//! - **Tanh**: hyperbolic tangent

pub mod functions;

pub use functions::Activation;
