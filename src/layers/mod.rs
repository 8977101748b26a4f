pub mod dense;
pub mod dropout;
pub mod initialization;

pub use dense::{DenseGradients, DenseLayer};
pub use dropout::DropoutLayer;
pub use initialization::WeightInit;
