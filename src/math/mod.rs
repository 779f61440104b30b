//! Mathematical utilities: 2×2 solves, logistic helpers, evaluation grids.

pub mod grid;
pub mod linalg;
pub mod stats;

pub use grid::*;
pub use linalg::*;
pub use stats::*;
