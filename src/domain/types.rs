//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation and fitting
//! - exported to JSON/CSV
//! - compared bit-for-bit across runs (no hidden state)

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A categorical label (participant id or condition).
///
/// Ordering is *natural* ("P2" < "P10"), with a plain byte comparison as a
/// tie-breaker so that `Ord` stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(value: impl Into<String>) -> Self {
        Label(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        natord::compare(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::new(value)
    }
}

/// A stimulus level (one distinct `x` value).
///
/// Equality is exact: two levels are the same only if the values are equal as
/// numbers. `-0.0` is normalized to `0.0`; NaN never reaches this type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(f64);

impl Level {
    /// Returns `None` for non-finite values.
    pub fn new(x: f64) -> Option<Self> {
        if !x.is_finite() {
            return None;
        }
        Some(Level(if x == 0.0 { 0.0 } else { x }))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One validated trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub id: Label,
    pub condition: Label,
    pub x: Level,
    /// Binary response: `true` for y=1.
    pub y: bool,
}

/// Fitting unit: a participant × condition pair (`id = Some`) or a whole
/// condition pooled across participants (`id = None`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub id: Option<Label>,
    pub condition: Label,
}

impl GroupKey {
    pub fn individual(id: Label, condition: Label) -> Self {
        Self {
            id: Some(id),
            condition,
        }
    }

    pub fn group(condition: Label) -> Self {
        Self { id: None, condition }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{id}/{}", self.condition),
            None => write!(f, "{}", self.condition),
        }
    }
}

/// Aggregated binomial counts at one stimulus level of one group.
///
/// Cells are only ever created from at least one trial, so `n() >= 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCell {
    pub key: GroupKey,
    pub x: Level,
    pub ones: u64,
    pub zeros: u64,
}

impl GroupCell {
    pub fn n(&self) -> u64 {
        self.ones + self.zeros
    }

    /// Observed proportion of y=1.
    pub fn prop(&self) -> f64 {
        self.ones as f64 / self.n() as f64
    }
}

/// Why a group cannot be fitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonIdentifiableReason {
    /// Fewer than two distinct x levels.
    TooFewLevels,
    /// Every trial has the same response.
    NoResponseVariance,
}

impl NonIdentifiableReason {
    pub fn describe(self) -> &'static str {
        match self {
            NonIdentifiableReason::TooFewLevels => "fewer than 2 distinct x levels",
            NonIdentifiableReason::NoResponseVariance => "no variance in y",
        }
    }
}

/// Outcome of one logistic fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum FitStatus {
    /// Deviance change fell below tolerance.
    Converged,
    /// The data cannot identify an intercept and a slope.
    NonIdentifiable(NonIdentifiableReason),
    /// Iteration cap reached, or step-halving could not improve the deviance.
    NotConverged,
    /// Coefficients diverge (perfect or quasi-complete separation).
    Diverged,
    /// The information matrix is singular or numerically ill-conditioned.
    Singular,
}

impl FitStatus {
    pub fn is_converged(self) -> bool {
        self == FitStatus::Converged
    }

    /// Short machine-friendly label used in exported tables.
    pub fn label(self) -> &'static str {
        RowStatus::from(self).label()
    }
}

/// Fitted coefficients and diagnostics for one group.
///
/// Unless `status` is `Converged`, the coefficient fields are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub key: GroupKey,
    pub status: FitStatus,
    /// `a` in `logit P(y=1|x) = a + b x`.
    pub intercept: f64,
    /// `b` in `logit P(y=1|x) = a + b x`.
    pub slope: f64,
    pub intercept_se: f64,
    pub slope_se: f64,
    /// Wald statistic `b / SE(b)`.
    pub slope_z: f64,
    /// Two-sided Wald p-value for `b = 0`.
    pub slope_p_value: f64,
    pub deviance: f64,
    pub null_deviance: f64,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub n_trials: u64,
    pub n_levels: usize,
}

impl FitResult {
    /// A result with NaN coefficients (for groups that could not be fitted).
    pub fn failed(key: GroupKey, status: FitStatus, n_trials: u64, n_levels: usize, iterations: usize) -> Self {
        Self {
            key,
            status,
            intercept: f64::NAN,
            slope: f64::NAN,
            intercept_se: f64::NAN,
            slope_se: f64::NAN,
            slope_z: f64::NAN,
            slope_p_value: f64::NAN,
            deviance: f64::NAN,
            null_deviance: f64::NAN,
            log_likelihood: f64::NAN,
            iterations,
            n_trials,
            n_levels,
        }
    }

    /// Fitted probability of y=1 at `x` (NaN for failed fits).
    pub fn predict(&self, x: f64) -> f64 {
        crate::math::sigmoid(self.intercept + self.slope * x)
    }
}

/// Why a PSE could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPse {
    /// The fit itself did not produce usable coefficients.
    FitInvalid,
    /// `|slope|` is within the numerical floor of zero.
    FlatSlope,
}

/// Point of subjective equality: `-a / b`, or an explicit marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pse {
    Defined(f64),
    Undefined(UndefinedPse),
}

impl Pse {
    pub fn value(self) -> Option<f64> {
        match self {
            Pse::Defined(v) => Some(v),
            Pse::Undefined(_) => None,
        }
    }
}

/// A fit plus its derived PSE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PseResult {
    pub fit: FitResult,
    pub pse: Pse,
}

/// One row of an exported result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub id: Option<Label>,
    pub condition: Label,
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub pse: Option<f64>,
    pub p_value: Option<f64>,
    pub status: RowStatus,
}

/// Status column of a result row: the fit status, or `FlatSlope` when a
/// converged fit has no usable PSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Ok,
    TooFewLevels,
    NoResponseVariance,
    NotConverged,
    Diverged,
    Singular,
    FlatSlope,
}

impl RowStatus {
    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Ok => "ok",
            RowStatus::TooFewLevels => "too_few_levels",
            RowStatus::NoResponseVariance => "no_response_variance",
            RowStatus::NotConverged => "not_converged",
            RowStatus::Diverged => "diverged",
            RowStatus::Singular => "singular",
            RowStatus::FlatSlope => "flat_slope",
        }
    }

    /// Row status of a fit and its derived PSE.
    pub fn of(result: &PseResult) -> Self {
        match (result.fit.status, result.pse) {
            (FitStatus::Converged, Pse::Undefined(UndefinedPse::FlatSlope)) => RowStatus::FlatSlope,
            (status, _) => RowStatus::from(status),
        }
    }
}

impl From<FitStatus> for RowStatus {
    fn from(status: FitStatus) -> Self {
        match status {
            FitStatus::Converged => RowStatus::Ok,
            FitStatus::NonIdentifiable(NonIdentifiableReason::TooFewLevels) => RowStatus::TooFewLevels,
            FitStatus::NonIdentifiable(NonIdentifiableReason::NoResponseVariance) => {
                RowStatus::NoResponseVariance
            }
            FitStatus::NotConverged => RowStatus::NotConverged,
            FitStatus::Diverged => RowStatus::Diverged,
            FitStatus::Singular => RowStatus::Singular,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Why a raw row was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingId,
    MissingCondition,
    MissingX,
    InvalidX,
    NonFiniteX,
    MissingY,
    NonBinaryY,
}

impl RejectReason {
    pub fn describe(self) -> &'static str {
        match self {
            RejectReason::MissingId => "missing ID",
            RejectReason::MissingCondition => "missing Condition",
            RejectReason::MissingX => "missing X",
            RejectReason::InvalidX => "non-numeric X",
            RejectReason::NonFiniteX => "non-finite X",
            RejectReason::MissingY => "missing Y",
            RejectReason::NonBinaryY => "Y not in {0, 1}",
        }
    }
}

/// A single excluded row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line number in the source table (header is line 1).
    pub line: usize,
    pub reason: RejectReason,
}

/// A recoverable problem reported alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Diagnostic {
    InvalidRecord { line: usize, reason: RejectReason },
    NonIdentifiableGroup { key: GroupKey, reason: NonIdentifiableReason },
    FitConvergence { key: GroupKey, status: FitStatus },
    UndefinedPse { key: GroupKey },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidRecord { line, reason } => {
                write!(f, "line {line}: row excluded ({})", reason.describe())
            }
            Diagnostic::NonIdentifiableGroup { key, reason } => {
                write!(f, "{key}: not fitted ({})", reason.describe())
            }
            Diagnostic::FitConvergence { key, status } => {
                write!(f, "{key}: fit failed ({})", status.label())
            }
            Diagnostic::UndefinedPse { key } => write!(f, "{key}: PSE undefined (slope ~ 0)"),
        }
    }
}

/// Numerical options for the logistic fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Hard cap on Newton/IRLS iterations per group.
    pub max_iterations: usize,
    /// Relative deviance-change tolerance.
    pub tolerance: f64,
    /// `|slope|` at or below this value leaves the PSE undefined.
    pub slope_floor: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-8,
            slope_floor: 1e-12,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    /// Columns combined (joined with `_`) into the condition label.
    pub condition_columns: Vec<String>,

    /// Plot axis bounds; only used for fitted curve grids, never by the fit.
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub grid_points: usize,

    pub fit: FitOptions,

    pub export_individual: Option<PathBuf>,
    pub export_group: Option<PathBuf>,
    pub export_cells: Option<PathBuf>,
    pub export_json: Option<PathBuf>,

    pub quiet: bool,
}
