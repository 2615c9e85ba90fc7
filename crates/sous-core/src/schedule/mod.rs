//! Grouping/projection: bucket live tasks into now / next / later
//! relative to the actual current time, for display.

use chrono::{DateTime, Utc};

use sous_store::models::{Task, TaskStatus, Timeline};

use crate::time::minutes_from_serve;

/// Pending tasks starting within this many minutes land in `next`.
pub const NEXT_WINDOW_MINUTES: i32 = 30;

/// Display buckets over pending and in-progress tasks. Completed and
/// skipped tasks are excluded. Each bucket is sorted by start time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGroups {
    /// In progress, or pending and already due.
    pub now: Vec<Task>,
    /// Pending, starting within the next 30 minutes.
    pub next: Vec<Task>,
    /// Pending, further out.
    pub later: Vec<Task>,
}

/// Bucket the timeline's live tasks relative to `now`.
pub fn group_tasks(timeline: &Timeline, now: DateTime<Utc>) -> TaskGroups {
    let now_minutes = minutes_from_serve(timeline.serve_at, now) as i32;

    let mut groups = TaskGroups::default();
    for task in &timeline.tasks {
        match task.status {
            TaskStatus::InProgress => groups.now.push(task.clone()),
            TaskStatus::Pending => {
                if task.start_minutes <= now_minutes {
                    groups.now.push(task.clone());
                } else if task.start_minutes <= now_minutes + NEXT_WINDOW_MINUTES {
                    groups.next.push(task.clone());
                } else {
                    groups.later.push(task.clone());
                }
            }
            TaskStatus::Completed | TaskStatus::Skipped => {}
        }
    }

    let by_start = |a: &Task, b: &Task| {
        a.start_minutes
            .cmp(&b.start_minutes)
            .then_with(|| a.title.cmp(&b.title))
    };
    groups.now.sort_by(by_start);
    groups.next.sort_by(by_start);
    groups.later.sort_by(by_start);
    groups
}
