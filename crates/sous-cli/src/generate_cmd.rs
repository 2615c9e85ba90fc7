//! `sous generate` command: build a timeline from a meal JSON file.

use anyhow::{Context, Result};

use sous_core::generate::{generate_timeline, HeuristicGenerator};
use sous_store::models::Meal;
use sous_store::MemoryStore;

/// Read a meal from `file`, plan it with the bundled heuristic
/// generator, and write the timeline JSON to `output` (stdout when
/// omitted).
pub async fn run_generate(file: &str, output: Option<&str>) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read meal file {file:?}"))?;
    let meal: Meal =
        serde_json::from_str(&contents).with_context(|| format!("invalid meal JSON in {file:?}"))?;

    let store = MemoryStore::new();
    let generator = HeuristicGenerator::new();
    let timeline = generate_timeline(&store, &generator, &meal)
        .await
        .with_context(|| format!("failed to generate a timeline for meal {:?}", meal.name))?;

    let json = serde_json::to_string_pretty(&timeline).context("failed to serialize timeline")?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write timeline to {path:?}"))?;
            eprintln!(
                "Wrote {} task(s) for {:?} to {path}",
                timeline.tasks.len(),
                meal.name
            );
        }
        None => println!("{json}"),
    }

    if timeline.has_conflicts {
        eprintln!(
            "Note: the plan has {} conflict(s); run `sous check` for details.",
            timeline.conflicts.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sous_test_utils::{meal_with_recipes, recipe};

    #[tokio::test]
    async fn generates_timeline_file_from_meal_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let meal_path = dir.path().join("meal.json");
        let out_path = dir.path().join("timeline.json");

        let meal = meal_with_recipes(vec![recipe("Soup", &[("Chop", 15), ("Simmer", 45)])]);
        std::fs::write(&meal_path, serde_json::to_string(&meal).unwrap()).unwrap();

        run_generate(
            meal_path.to_str().unwrap(),
            Some(out_path.to_str().unwrap()),
        )
        .await
        .unwrap();

        let written = std::fs::read_to_string(&out_path).unwrap();
        let timeline: sous_store::models::Timeline = serde_json::from_str(&written).unwrap();
        assert_eq!(timeline.tasks.len(), 2);
        assert_eq!(timeline.meal_id, meal.id);
    }

    #[tokio::test]
    async fn invalid_json_is_a_readable_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let meal_path = dir.path().join("meal.json");
        std::fs::write(&meal_path, "not json {{{").unwrap();

        let result = run_generate(meal_path.to_str().unwrap(), None).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("invalid meal JSON"), "got: {message}");
    }

    #[tokio::test]
    async fn missing_file_is_a_readable_error() {
        let result = run_generate("/nonexistent/meal.json", None).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("failed to read meal file"), "got: {message}");
    }
}
