//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated trials and their grouping keys (`TrialRecord`, `Label`, `Level`, `GroupKey`)
//! - aggregated counts (`GroupCell`)
//! - fit outputs (`FitResult`, `FitStatus`, `Pse`, `PseResult`, `ResultRow`)
//! - recoverable problems (`Diagnostic`, `RejectReason`)
//! - run configuration (`FitConfig`, `FitOptions`)

pub mod types;

pub use types::*;
