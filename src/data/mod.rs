//! Input data: the raw table, validated trials, and synthetic trials.

pub mod dataset;
pub mod sample;
pub mod table;

pub use dataset::*;
pub use sample::*;
pub use table::*;
