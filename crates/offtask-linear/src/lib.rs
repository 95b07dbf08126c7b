//! Binary logistic regression with per-sample weights and an L2 penalty,
//! fitted by full-batch gradient descent.

mod config;
mod error;
mod model;

pub use config::LogisticConfig;
pub use error::LinearError;
pub use model::{LogisticRegression, sigmoid};
