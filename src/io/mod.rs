//! Input/output helpers.
//!
//! - CSV ingest into a raw table (`ingest`)
//! - CSV exports of results, counts and trials (`export`)
//! - JSON run report with fitted curve grids (`report`)

pub mod export;
pub mod ingest;
pub mod report;

pub use export::*;
pub use ingest::*;
pub use report::*;
