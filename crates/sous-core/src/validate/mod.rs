//! Conflict validator: pure feasibility checks over a task set.
//!
//! `validate` never performs I/O and never fails -- it reports. Rules:
//! dependency cycles (three-color DFS), missing dependency references,
//! oven double-booking over half-open `[start, end)` intervals (severity
//! depends on whether the temperatures agree), and timing rules (a task
//! must end after it starts, and must not start before a dependency
//! finishes).
//!
//! The produced conflict set always *replaces* the previous one; callers
//! re-run validation after every mutation that can affect timing,
//! dependencies, or oven fields.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use sous_store::models::{ConflictKind, Severity, Task, TimelineConflict};

/// Outcome of one validation pass.
///
/// `is_valid` is true when no error-severity conflict exists; warnings
/// (a shared-temperature oven overlap) do not invalidate the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub conflicts: Vec<TimelineConflict>,
}

/// Validate a task set. Pure and deterministic: the same input yields an
/// identical conflict set, in a stable order (errors first, then by the
/// earliest involved start time).
pub fn validate(tasks: &[Task]) -> ValidationReport {
    let index: HashMap<Uuid, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

    let mut conflicts = Vec::new();
    check_missing_dependencies(tasks, &index, &mut conflicts);
    check_cycles(tasks, &index, &mut conflicts);
    check_timing(tasks, &index, &mut conflicts);
    check_oven_overlaps(tasks, &mut conflicts);

    sort_conflicts(tasks, &index, &mut conflicts);

    let is_valid = conflicts.iter().all(|c| c.severity != Severity::Error);
    ValidationReport { is_valid, conflicts }
}

/// Validate and refresh each task's `is_valid` / `validation_errors`
/// annotation in place. The annotation always replaces the previous one.
///
/// A task is invalid when an error-severity conflict involves it;
/// `validation_errors` carries the messages of those conflicts.
pub fn validate_and_annotate(tasks: &mut [Task]) -> ValidationReport {
    let report = validate(tasks);
    for task in tasks.iter_mut() {
        task.is_valid = true;
        task.validation_errors.clear();
    }
    for conflict in &report.conflicts {
        if conflict.severity != Severity::Error {
            continue;
        }
        for id in &conflict.task_ids {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == *id) {
                task.is_valid = false;
                task.validation_errors.push(conflict.message.clone());
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn check_missing_dependencies(
    tasks: &[Task],
    index: &HashMap<Uuid, usize>,
    conflicts: &mut Vec<TimelineConflict>,
) {
    for task in tasks {
        for dep in &task.depends_on {
            if *dep != task.id && !index.contains_key(dep) {
                conflicts.push(TimelineConflict {
                    kind: ConflictKind::MissingDependency,
                    severity: Severity::Error,
                    task_ids: vec![task.id],
                    message: format!(
                        "\"{}\" depends on a task ({dep}) that is not in the timeline",
                        task.title
                    ),
                });
            }
        }
    }
}

/// Three-color DFS over the edges `task -> depends_on`. White = unseen,
/// gray = on the current path, black = finished. A gray hit is a back
/// edge; everything from that node to the top of the path is on a cycle.
fn check_cycles(
    tasks: &[Task],
    index: &HashMap<Uuid, usize>,
    conflicts: &mut Vec<TimelineConflict>,
) {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn visit(
        v: usize,
        adj: &[Vec<usize>],
        colors: &mut [Color],
        path: &mut Vec<usize>,
        on_cycle: &mut HashSet<usize>,
    ) {
        colors[v] = Color::Gray;
        path.push(v);
        for &w in &adj[v] {
            match colors[w] {
                Color::Gray => {
                    // Back edge: the path segment from w to v is a cycle.
                    let start = path.iter().position(|&p| p == w).unwrap_or(0);
                    on_cycle.extend(path[start..].iter().copied());
                }
                Color::White => visit(w, adj, colors, path, on_cycle),
                Color::Black => {}
            }
        }
        path.pop();
        colors[v] = Color::Black;
    }

    let n = tasks.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut on_cycle: HashSet<usize> = HashSet::new();

    for (i, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            if *dep == task.id {
                // Self-reference is the degenerate cycle.
                on_cycle.insert(i);
            } else if let Some(&j) = index.get(dep) {
                adj[i].push(j);
            }
        }
    }

    let mut colors = vec![Color::White; n];
    let mut path = Vec::new();
    for v in 0..n {
        if colors[v] == Color::White {
            visit(v, &adj, &mut colors, &mut path, &mut on_cycle);
        }
    }

    if !on_cycle.is_empty() {
        let mut members: Vec<usize> = on_cycle.into_iter().collect();
        members.sort_by_key(|&i| (tasks[i].start_minutes, tasks[i].title.clone()));
        let titles: Vec<&str> = members.iter().map(|&i| tasks[i].title.as_str()).collect();
        conflicts.push(TimelineConflict {
            kind: ConflictKind::DependencyCycle,
            severity: Severity::Error,
            task_ids: members.iter().map(|&i| tasks[i].id).collect(),
            message: format!("dependency cycle involving: {}", titles.join(", ")),
        });
    }
}

fn check_timing(
    tasks: &[Task],
    index: &HashMap<Uuid, usize>,
    conflicts: &mut Vec<TimelineConflict>,
) {
    for task in tasks {
        if task.end_minutes <= task.start_minutes {
            conflicts.push(TimelineConflict {
                kind: ConflictKind::TimingError,
                severity: Severity::Error,
                task_ids: vec![task.id],
                message: format!("\"{}\" must end after it starts", task.title),
            });
        }

        for dep in &task.depends_on {
            let Some(&j) = index.get(dep) else { continue };
            let dep_task = &tasks[j];
            if dep_task.id != task.id && dep_task.end_minutes > task.start_minutes {
                conflicts.push(TimelineConflict {
                    kind: ConflictKind::TimingError,
                    severity: Severity::Error,
                    task_ids: vec![task.id, dep_task.id],
                    message: format!(
                        "\"{}\" starts before its dependency \"{}\" finishes",
                        task.title, dep_task.title
                    ),
                });
            }
        }
    }
}

/// Pairwise overlap among oven tasks, half-open intervals `[start, end)`.
/// Matching temperatures (or temperatures left unspecified on either
/// side) can share one oven: warning. Differing temperatures cannot run
/// simultaneously: error.
fn check_oven_overlaps(tasks: &[Task], conflicts: &mut Vec<TimelineConflict>) {
    let oven_tasks: Vec<&Task> = tasks.iter().filter(|t| t.requires_oven).collect();
    for (i, a) in oven_tasks.iter().enumerate() {
        for b in &oven_tasks[i + 1..] {
            let overlaps = a.start_minutes < b.end_minutes && b.start_minutes < a.end_minutes;
            if !overlaps {
                continue;
            }
            let severity = match (a.oven_temp, b.oven_temp) {
                (Some(ta), Some(tb)) if ta != tb => Severity::Error,
                _ => Severity::Warning,
            };
            let message = match severity {
                Severity::Error => format!(
                    "\"{}\" ({}°) and \"{}\" ({}°) need the oven at different temperatures at the same time",
                    a.title,
                    a.oven_temp.unwrap_or(0),
                    b.title,
                    b.oven_temp.unwrap_or(0),
                ),
                Severity::Warning => format!(
                    "\"{}\" and \"{}\" share the oven; check there is rack space for both",
                    a.title, b.title
                ),
            };
            conflicts.push(TimelineConflict {
                kind: ConflictKind::OvenOverlap,
                severity,
                task_ids: vec![a.id, b.id],
                message,
            });
        }
    }
}

/// Stable presentation order: errors before warnings, then by the
/// earliest start time among the involved tasks.
fn sort_conflicts(
    tasks: &[Task],
    index: &HashMap<Uuid, usize>,
    conflicts: &mut [TimelineConflict],
) {
    conflicts.sort_by_key(|c| {
        let earliest = c
            .task_ids
            .iter()
            .filter_map(|id| index.get(id).map(|&i| tasks[i].start_minutes))
            .min()
            .unwrap_or(i32::MAX);
        (c.severity.rank(), earliest)
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
