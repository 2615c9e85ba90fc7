//! `sous check` command: validate a timeline JSON file and print its
//! conflicts.

use anyhow::{bail, Context, Result};

use sous_core::validate;
use sous_store::models::{Severity, Timeline};

/// Validate the timeline in `file`. Prints each conflict; fails if any
/// error-severity conflict exists so the command is scriptable.
pub fn run_check(file: &str) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read timeline file {file:?}"))?;
    let timeline: Timeline = serde_json::from_str(&contents)
        .with_context(|| format!("invalid timeline JSON in {file:?}"))?;

    let report = validate::validate(&timeline.tasks);

    if report.conflicts.is_empty() {
        println!("OK: {} task(s), no conflicts.", timeline.tasks.len());
        return Ok(());
    }

    let errors = report
        .conflicts
        .iter()
        .filter(|c| c.severity == Severity::Error)
        .count();
    let warnings = report.conflicts.len() - errors;
    println!(
        "{} conflict(s): {errors} error(s), {warnings} warning(s)",
        report.conflicts.len()
    );
    for conflict in &report.conflicts {
        println!("  [{}] {}: {}", conflict.severity, conflict.kind, conflict.message);
    }

    if !report.is_valid {
        bail!("timeline has {errors} error-severity conflict(s)");
    }
    Ok(())
}
