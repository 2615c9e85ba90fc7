//! `sous show` command: print a timeline's now/next/later view.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};

use sous_core::schedule::{group_tasks, TaskGroups};
use sous_core::time::wall_clock;
use sous_store::models::{Task, Timeline};

/// Show the live grouping for the timeline in `file`.
///
/// `minutes_to_serve` overrides the clock: pretend serve is that many
/// minutes away. Without it, the real current time is used.
pub fn run_show(file: &str, minutes_to_serve: Option<i64>) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read timeline file {file:?}"))?;
    let timeline: Timeline = serde_json::from_str(&contents)
        .with_context(|| format!("invalid timeline JSON in {file:?}"))?;

    let now = match minutes_to_serve {
        Some(minutes) => timeline.serve_at - Duration::minutes(minutes),
        None => Utc::now(),
    };

    let groups = group_tasks(&timeline, now);
    print_groups(&timeline, &groups);
    Ok(())
}

fn print_groups(timeline: &Timeline, groups: &TaskGroups) {
    println!(
        "Serve at {} | {} task(s)",
        timeline.serve_at.format("%Y-%m-%d %H:%M UTC"),
        timeline.tasks.len()
    );
    if timeline.has_conflicts {
        println!("! {} conflict(s) -- run `sous check`", timeline.conflicts.len());
    }
    println!();

    print_bucket(timeline, "NOW", &groups.now);
    print_bucket(timeline, "NEXT (30 min)", &groups.next);
    print_bucket(timeline, "LATER", &groups.later);
}

fn print_bucket(timeline: &Timeline, label: &str, tasks: &[Task]) {
    println!("{label}:");
    if tasks.is_empty() {
        println!("  (nothing)");
    }
    for task in tasks {
        let at = wall_clock(timeline.serve_at, task.start_minutes);
        println!(
            "  {} [{}] {} ({} min)",
            at.format("%H:%M"),
            task.status,
            task.title,
            task.duration_minutes
        );
    }
    println!();
}
