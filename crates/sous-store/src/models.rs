use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a single cooking task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// Run state of a timeline: `not_started -> running -> ended`, linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Ended,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

impl FromStr for RunState {
    type Err = RunStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "running" => Ok(Self::Running),
            "ended" => Ok(Self::Ended),
            other => Err(RunStateParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`RunState`] string.
#[derive(Debug, Clone)]
pub struct RunStateParseError(pub String);

impl fmt::Display for RunStateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid run state: {:?}", self.0)
    }
}

impl std::error::Error for RunStateParseError {}

// ---------------------------------------------------------------------------

/// Kind of conflict detected by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    OvenOverlap,
    DependencyCycle,
    TimingError,
    MissingDependency,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OvenOverlap => "oven_overlap",
            Self::DependencyCycle => "dependency_cycle",
            Self::TimingError => "timing_error",
            Self::MissingDependency => "missing_dependency",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictKind {
    type Err = ConflictKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oven_overlap" => Ok(Self::OvenOverlap),
            "dependency_cycle" => Ok(Self::DependencyCycle),
            "timing_error" => Ok(Self::TimingError),
            "missing_dependency" => Ok(Self::MissingDependency),
            other => Err(ConflictKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ConflictKind`] string.
#[derive(Debug, Clone)]
pub struct ConflictKindParseError(pub String);

impl fmt::Display for ConflictKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid conflict kind: {:?}", self.0)
    }
}

impl std::error::Error for ConflictKindParseError {}

// ---------------------------------------------------------------------------

/// Severity of a conflict. Errors make the plan infeasible on one oven;
/// warnings flag risk the cook can live with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Sort rank: errors before warnings.
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = SeverityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(SeverityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Severity`] string.
#[derive(Debug, Clone)]
pub struct SeverityParseError(pub String);

impl fmt::Display for SeverityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid severity: {:?}", self.0)
    }
}

impl std::error::Error for SeverityParseError {}

// ---------------------------------------------------------------------------
// Timeline data
// ---------------------------------------------------------------------------

/// A validator-detected condition that makes the timeline infeasible or
/// risky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    /// Tasks involved in the conflict.
    pub task_ids: Vec<Uuid>,
    pub message: String,
}

/// An atomic cooking step with a relative time window, optional oven
/// requirement, and a set of dependencies.
///
/// All times are minutes relative to serve time (0 = serve, negative =
/// before). `end_minutes` is derived and must always equal
/// `start_minutes + duration_minutes`; mutate times through
/// [`Task::recompute_end`] or [`Task::apply`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub recipe_id: Uuid,
    pub instruction_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub end_minutes: i32,
    pub requires_oven: bool,
    pub oven_temp: Option<i32>,
    pub depends_on: Vec<Uuid>,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub is_valid: bool,
    pub validation_errors: Vec<String>,
}

impl Task {
    /// Build a new pending task with a fresh id and a consistent end time.
    pub fn new(
        meal_id: Uuid,
        recipe_id: Uuid,
        title: impl Into<String>,
        start_minutes: i32,
        duration_minutes: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            meal_id,
            recipe_id,
            instruction_id: None,
            title: title.into(),
            description: None,
            start_minutes,
            duration_minutes,
            end_minutes: start_minutes + duration_minutes,
            requires_oven: false,
            oven_temp: None,
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            completed_at: None,
            notes: None,
            is_valid: true,
            validation_errors: Vec::new(),
        }
    }

    /// Force `end_minutes = start_minutes + duration_minutes`.
    pub fn recompute_end(&mut self) {
        self.end_minutes = self.start_minutes + self.duration_minutes;
    }

    /// Apply a partial update. Recomputes `end_minutes` whenever start or
    /// duration changed.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(start) = patch.start_minutes {
            self.start_minutes = start;
        }
        if let Some(duration) = patch.duration_minutes {
            self.duration_minutes = duration;
        }
        if patch.start_minutes.is_some() || patch.duration_minutes.is_some() {
            self.recompute_end();
        }
        if let Some(requires_oven) = patch.requires_oven {
            self.requires_oven = requires_oven;
        }
        if let Some(ref oven_temp) = patch.oven_temp {
            self.oven_temp = *oven_temp;
        }
        if let Some(ref deps) = patch.depends_on {
            self.depends_on = deps.clone();
        }
        if let Some(ref notes) = patch.notes {
            self.notes = notes.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref completed_at) = patch.completed_at {
            self.completed_at = *completed_at;
        }
    }
}

/// Partial update for a task. `None` fields are left untouched; the
/// double-`Option` fields distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_minutes: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub requires_oven: Option<bool>,
    pub oven_temp: Option<Option<i32>>,
    pub depends_on: Option<Vec<Uuid>>,
    pub notes: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// Whether the patch touches timing, dependency, or oven fields --
    /// the mutations that require re-validation.
    pub fn affects_validation(&self) -> bool {
        self.start_minutes.is_some()
            || self.duration_minutes.is_some()
            || self.requires_oven.is_some()
            || self.oven_temp.is_some()
            || self.depends_on.is_some()
    }
}

/// The full plan for one meal: an ordered set of tasks plus the latest
/// validation summary and live-run bookkeeping.
///
/// Task order is a display/sort order, independent of time order.
/// `current_task_id` is a weak id reference cached from the last mutation;
/// [`Timeline::derived_current_task`] is the authoritative value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: Uuid,
    pub meal_id: Uuid,
    /// Target serve time: the zero point tasks are relative to. Editing
    /// it shifts the whole plan without touching any task.
    pub serve_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
    pub has_conflicts: bool,
    pub conflicts: Vec<TimelineConflict>,
    pub run_state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub current_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timeline {
    /// Build an empty timeline for a meal served at `serve_at`.
    pub fn new(meal_id: Uuid, serve_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            meal_id,
            serve_at,
            tasks: Vec::new(),
            has_conflicts: false,
            conflicts: Vec::new(),
            run_state: RunState::NotStarted,
            started_at: None,
            current_task_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether cooking is live. Stays true after the last checkoff until
    /// an explicit finish.
    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    /// Look up a task by id.
    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Look up a task by id, mutably.
    pub fn task_mut(&mut self, task_id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// The task considered active right now, derived from statuses: the
    /// earliest in-progress task, else the earliest pending task, ordered
    /// by `(start_minutes, title)` for determinism. `None` means every
    /// task is done or skipped.
    pub fn derived_current_task(&self) -> Option<Uuid> {
        let earliest = |status: TaskStatus| {
            self.tasks
                .iter()
                .filter(|t| t.status == status)
                .min_by(|a, b| {
                    a.start_minutes
                        .cmp(&b.start_minutes)
                        .then_with(|| a.title.cmp(&b.title))
                })
                .map(|t| t.id)
        };
        earliest(TaskStatus::InProgress).or_else(|| earliest(TaskStatus::Pending))
    }

    /// Remove a task and scrub its id from every other task's
    /// `depends_on`, so no dangling reference survives.
    ///
    /// Returns the removed task, or `None` if the id is unknown.
    pub fn remove_task(&mut self, task_id: Uuid) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        let removed = self.tasks.remove(idx);
        for task in &mut self.tasks {
            task.depends_on.retain(|dep| *dep != task_id);
        }
        Some(removed)
    }

    /// Reorder tasks to match `ordered`. Ids not present in the timeline
    /// are ignored; tasks missing from `ordered` keep their relative
    /// order after the listed ones. Display order only -- timing is
    /// untouched.
    pub fn reorder(&mut self, ordered: &[Uuid]) {
        let mut reordered: Vec<Task> = Vec::with_capacity(self.tasks.len());
        for id in ordered {
            if let Some(idx) = self.tasks.iter().position(|t| t.id == *id) {
                reordered.push(self.tasks.remove(idx));
            }
        }
        reordered.append(&mut self.tasks);
        self.tasks = reordered;
    }

    /// Replace the conflict summary. The new set always replaces, never
    /// appends to, the previous one.
    pub fn set_conflicts(&mut self, conflicts: Vec<TimelineConflict>) {
        self.has_conflicts = !conflicts.is_empty();
        self.conflicts = conflicts;
    }

    /// Apply a partial update to the timeline's own fields.
    pub fn apply(&mut self, patch: &TimelinePatch) {
        if let Some(serve_at) = patch.serve_at {
            self.serve_at = serve_at;
        }
        if let Some(ref conflicts) = patch.conflicts {
            self.set_conflicts(conflicts.clone());
        }
        if let Some(run_state) = patch.run_state {
            self.run_state = run_state;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(ref current) = patch.current_task_id {
            self.current_task_id = *current;
        }
    }
}

/// Partial update for a timeline's own fields (not its tasks).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelinePatch {
    /// New serve anchor. Task minutes are serve-relative, so this shifts
    /// the whole plan without touching any task.
    pub serve_at: Option<DateTime<Utc>>,
    pub conflicts: Option<Vec<TimelineConflict>>,
    pub run_state: Option<RunState>,
    pub started_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the cached pointer (cooking complete).
    pub current_task_id: Option<Option<Uuid>>,
}

// ---------------------------------------------------------------------------
// Meal input model
// ---------------------------------------------------------------------------

/// A meal as handed to the generation orchestrator. Input only -- sous
/// reads it to build a timeline and never persists or mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    /// Target wall-clock serve time: the zero point for all task timing.
    pub serve_at: DateTime<Utc>,
    pub guest_count: u32,
    pub recipes: Vec<Recipe>,
}

/// A scaled recipe within a meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub scale_factor: f64,
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}

/// One instruction within a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub id: Uuid,
    pub text: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub requires_oven: bool,
    #[serde(default)]
    pub oven_temp: Option<i32>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
