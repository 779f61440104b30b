//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{FitConfig, ResultRow};
use crate::report::{LevelSummary, RunSummary};

/// Placeholder printed (and exported) for undefined values.
pub const MISSING: &str = "NA";

/// Format the run summary (input counts + fit outcome counts).
pub fn format_run_summary(summary: &RunSummary, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== pse - psychometric fits ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Rows: read={} | used={} | excluded={}\n",
        summary.rows_read, summary.rows_used, summary.rows_excluded
    ));
    for (reason, count) in &summary.exclusions {
        out.push_str(&format!("  - {count} x {}\n", reason.describe()));
    }

    out.push_str(&format_level("Individual", &summary.individual));
    out.push_str(&format_level("Group", &summary.group));

    let group_problems: Vec<String> = summary
        .diagnostics
        .iter()
        .filter(|d| !matches!(d, crate::domain::Diagnostic::InvalidRecord { .. }))
        .map(|d| format!("  ! {d}\n"))
        .collect();
    if !group_problems.is_empty() {
        out.push_str("Flagged groups:\n");
        out.push_str(&group_problems.concat());
    }

    out
}

fn format_level(title: &str, s: &LevelSummary) -> String {
    format!(
        "{title} fits: groups={} | fitted={} | failed={} | undefined PSE={}\n",
        s.groups, s.fitted, s.failed, s.undefined_pse
    )
}

/// Format one result table (individual rows carry an id column).
pub fn format_result_table(title: &str, rows: &[ResultRow]) -> String {
    let with_id = rows.iter().any(|r| r.id.is_some());
    let mut out = String::new();
    out.push_str(&format!("{title}:\n"));

    let id_header = if with_id { format!("{:<12} ", "ID") } else { String::new() };
    out.push_str(
        format!(
            "{id_header}{:<16} {:>10} {:>10} {:>10} {:>10} {:<16}",
            "Condition", "a", "b", "pse", "p.value", "status"
        )
        .trim_end(),
    );
    out.push('\n');

    let id_rule = if with_id { format!("{:-<12} ", "") } else { String::new() };
    out.push_str(
        format!(
            "{id_rule}{:-<16} {:-<10} {:-<10} {:-<10} {:-<10} {:-<16}",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let id = match (&r.id, with_id) {
            (Some(id), true) => format!("{:<12} ", truncate(id.as_str(), 12)),
            (None, true) => format!("{:<12} ", ""),
            _ => String::new(),
        };
        out.push_str(
            format!(
                "{id}{:<16} {:>10} {:>10} {:>10} {:>10} {:<16}",
                truncate(r.condition.as_str(), 16),
                fmt_num(r.a, 4),
                fmt_num(r.b, 4),
                fmt_num(r.pse, 4),
                fmt_p(r.p_value),
                r.status,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_num(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => MISSING.to_string(),
    }
}

fn fmt_p(v: Option<f64>) -> String {
    match v {
        Some(p) if p < 1e-4 => format!("{p:.2e}"),
        Some(p) => format!("{p:.4}"),
        None => MISSING.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
