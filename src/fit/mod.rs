//! Model fitting.
//!
//! Responsibilities:
//!
//! - fit a binomial-count logistic regression per group (`logistic`)
//! - derive the PSE from the fitted coefficients (`pse`)
//! - run all groups (parallel) and collect fit diagnostics (`batch`)

pub mod batch;
pub mod logistic;
pub mod pse;

pub use batch::*;
pub use logistic::*;
pub use pse::*;
