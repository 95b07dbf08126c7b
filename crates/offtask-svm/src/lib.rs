//! Binary C-support vector classification.
//!
//! Training solves the soft-margin dual with a sequential minimal
//! optimization (SMO) loop using second-order working-set selection.
//! Per-sample weights scale the box constraint, so `C_i = C · w_i`.

mod config;
mod error;
mod kernel;
mod model;
mod smo;

pub use config::SvmConfig;
pub use error::SvmError;
pub use kernel::Kernel;
pub use model::SvmModel;
