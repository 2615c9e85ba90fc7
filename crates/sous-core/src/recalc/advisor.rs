//! The `RecalcAdvisor` trait and a deterministic local implementation.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use sous_store::models::{TaskStatus, Timeline};

use crate::time::minutes_from_serve;

use super::RecalculationSuggestion;

/// Adapter interface for "running behind" recalculation services.
///
/// Always returns exactly one suggestion, never a full re-plan. Each
/// call is fresh and independent: it sees the same timeline snapshot,
/// not the residue of previously rejected suggestions.
#[async_trait]
pub trait RecalcAdvisor: Send + Sync {
    /// Human-readable name for this advisor (e.g. "local").
    fn name(&self) -> &str;

    /// Propose a single task move (with its cascaded dependents) that
    /// recovers the schedule. `context` is optional free text from the
    /// cook ("the turkey needs 20 more minutes").
    async fn suggest(
        &self,
        timeline: &Timeline,
        now: DateTime<Utc>,
        context: Option<&str>,
    ) -> Result<RecalculationSuggestion>;
}

// Compile-time assertion: RecalcAdvisor must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn RecalcAdvisor) {}
};

/// Deterministic, network-free advisor: move the most overdue pending
/// task to the current minute and cascade its pending dependents so
/// relative spacing is preserved.
#[derive(Debug, Default)]
pub struct LocalAdvisor;

impl LocalAdvisor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecalcAdvisor for LocalAdvisor {
    fn name(&self) -> &str {
        "local"
    }

    async fn suggest(
        &self,
        timeline: &Timeline,
        now: DateTime<Utc>,
        _context: Option<&str>,
    ) -> Result<RecalculationSuggestion> {
        let now_minutes = minutes_from_serve(timeline.serve_at, now) as i32;

        let overdue = timeline
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending && t.start_minutes < now_minutes)
            .min_by(|a, b| {
                a.start_minutes
                    .cmp(&b.start_minutes)
                    .then_with(|| a.title.cmp(&b.title))
            });

        let Some(task) = overdue else {
            bail!("no pending task is behind schedule");
        };

        let delta = now_minutes - task.start_minutes;
        let affected = pending_dependents(timeline, task.id);

        Ok(RecalculationSuggestion {
            task_id: task.id,
            new_start_minutes: now_minutes,
            description: format!(
                "Push \"{}\" back {delta} minutes to start now; {} follow-on task(s) move with it",
                task.title,
                affected.len()
            ),
            tasks_shifted: affected.len() + 1,
            affected_task_ids: affected,
        })
    }
}

/// Transitive pending dependents of `root`, in deterministic order.
fn pending_dependents(timeline: &Timeline, root: Uuid) -> Vec<Uuid> {
    let mut result = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    seen.insert(root);
    let mut frontier = vec![root];

    while let Some(current) = frontier.pop() {
        let mut next: Vec<&_> = timeline
            .tasks
            .iter()
            .filter(|t| t.depends_on.contains(&current) && !seen.contains(&t.id))
            .collect();
        next.sort_by(|a, b| {
            a.start_minutes
                .cmp(&b.start_minutes)
                .then_with(|| a.title.cmp(&b.title))
        });
        for task in next {
            seen.insert(task.id);
            if task.status == TaskStatus::Pending {
                result.push(task.id);
            }
            frontier.push(task.id);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sous_store::models::Task;

    fn timeline_at(serve_offset_minutes: i64) -> (Timeline, DateTime<Utc>) {
        let now = Utc::now();
        let serve_at = now + Duration::minutes(serve_offset_minutes);
        (Timeline::new(Uuid::new_v4(), serve_at), now)
    }

    fn task(meal_id: Uuid, title: &str, start: i32, duration: i32) -> Task {
        Task::new(meal_id, Uuid::new_v4(), title, start, duration)
    }

    #[tokio::test]
    async fn picks_most_overdue_pending_task() {
        // Serve in 60 minutes, so "now" is minute -60.
        let (mut timeline, now) = timeline_at(60);
        let meal_id = timeline.meal_id;
        // Started 30 minutes ago and not done.
        let overdue = task(meal_id, "Simmer sauce", -90, 20);
        let future = task(meal_id, "Plate", -10, 10);
        let overdue_id = overdue.id;
        timeline.tasks = vec![overdue, future];

        let suggestion = LocalAdvisor::new()
            .suggest(&timeline, now, None)
            .await
            .unwrap();
        assert_eq!(suggestion.task_id, overdue_id);
        assert_eq!(suggestion.new_start_minutes, -60);
        assert_eq!(suggestion.tasks_shifted, 1);
    }

    #[tokio::test]
    async fn cascades_pending_dependents() {
        let (mut timeline, now) = timeline_at(60);
        let meal_id = timeline.meal_id;
        let root = task(meal_id, "Roast", -120, 30);
        let mut child = task(meal_id, "Rest", -90, 15);
        child.depends_on = vec![root.id];
        let mut grandchild = task(meal_id, "Carve", -75, 10);
        grandchild.depends_on = vec![child.id];
        let (child_id, grandchild_id) = (child.id, grandchild.id);
        timeline.tasks = vec![root, child, grandchild];

        let suggestion = LocalAdvisor::new()
            .suggest(&timeline, now, None)
            .await
            .unwrap();
        assert_eq!(
            suggestion.affected_task_ids,
            vec![child_id, grandchild_id]
        );
        assert_eq!(suggestion.tasks_shifted, 3);
    }

    #[tokio::test]
    async fn completed_dependents_do_not_move() {
        let (mut timeline, now) = timeline_at(60);
        let meal_id = timeline.meal_id;
        let root = task(meal_id, "Roast", -120, 30);
        let mut done = task(meal_id, "Preheat", -90, 10);
        done.depends_on = vec![root.id];
        done.status = TaskStatus::Completed;
        timeline.tasks = vec![root, done];

        let suggestion = LocalAdvisor::new()
            .suggest(&timeline, now, None)
            .await
            .unwrap();
        assert!(suggestion.affected_task_ids.is_empty());
    }

    #[tokio::test]
    async fn errors_when_nothing_is_behind() {
        let (mut timeline, now) = timeline_at(180);
        let meal_id = timeline.meal_id;
        timeline.tasks = vec![task(meal_id, "Roast", -120, 30)];

        let result = LocalAdvisor::new().suggest(&timeline, now, None).await;
        assert!(result.is_err());
    }
}
