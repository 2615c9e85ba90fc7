//! A deterministic, network-free [`TaskGenerator`].
//!
//! Walks each recipe's steps backwards from serve time so every recipe
//! finishes exactly at serve, chaining dependencies between consecutive
//! steps and carrying oven metadata through. Durations stretch a little
//! for heavily scaled batches.

use anyhow::Result;
use async_trait::async_trait;

use super::raw::{GenerateRequest, RawTask, TaskGenerator};

/// Scale factor above which step durations are stretched.
const SCALE_STRETCH_THRESHOLD: f64 = 1.5;

/// Stretch applied to step durations for heavily scaled recipes.
const SCALE_STRETCH: f64 = 1.25;

#[derive(Debug, Default)]
pub struct HeuristicGenerator;

impl HeuristicGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskGenerator for HeuristicGenerator {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<RawTask>> {
        let mut tasks: Vec<RawTask> = Vec::new();

        for recipe in &request.recipes {
            let stretch = if recipe.scale_factor > SCALE_STRETCH_THRESHOLD {
                SCALE_STRETCH
            } else {
                1.0
            };

            // Backwards pass: the last step ends at serve (minute 0).
            let mut end = 0i32;
            let mut scheduled: Vec<RawTask> = Vec::new();
            for (step_index, step) in recipe.steps.iter().enumerate().rev() {
                let duration =
                    ((f64::from(step.duration_minutes.max(1)) * stretch).ceil() as i32).max(1);
                let start = end - duration;
                scheduled.push(RawTask {
                    title: format!("{}: {}", recipe.name, step.text),
                    description: None,
                    start_minutes: start,
                    duration_minutes: duration,
                    requires_oven: Some(step.requires_oven),
                    oven_temp: step.oven_temp,
                    depends_on: Vec::new(),
                    recipe: Some(recipe.name.clone()),
                    step_index: Some(step_index),
                });
                end = start;
            }
            scheduled.reverse();

            // Chain each step onto the previous one, using indices into
            // the combined list.
            let base = tasks.len();
            for (offset, task) in scheduled.iter_mut().enumerate() {
                if offset > 0 {
                    task.depends_on = vec![base + offset - 1];
                }
            }
            tasks.extend(scheduled);
        }

        Ok(tasks)
    }
}
