//! Task description rendering
//!
//! The description is the stage's instructions, its expected output and,
//! after the first stage, the text of every output recorded so far. Rendering
//! is strict: a reference to a stage output that has not been recorded yet
//! fails instead of rendering empty.

use crate::context::ContextStore;
use crate::error::Result;
use crate::stage::Stage;
use minijinja::{Environment, UndefinedBehavior, context};
use serde::Serialize;
use std::collections::BTreeMap;

const TASK_TEMPLATE: &str = "task";

// Nothing follows the last output, so it reaches the model byte for byte
const TASK_LAYOUT: &str = concat!(
    "{{ instructions }}\n\nExpected output: {{ expected_output }}",
    "{% if prior %}\n\nUse the following analysis data as context:",
    "{% for entry in prior %}\n\n=== {{ entry.stage }} ===\n{{ entry.output }}{% endfor %}",
    "{% endif %}",
);

#[derive(Serialize)]
struct PriorOutput {
    stage: &'static str,
    output: String,
}

/// Renders stage task descriptions against the context store
pub struct TaskRenderer {
    env: Environment<'static>,
}

impl TaskRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template(TASK_TEMPLATE, TASK_LAYOUT)?;
        Ok(Self { env })
    }

    /// Task description for `stage` given everything recorded before it
    pub fn render(&self, stage: &Stage, symbol: &str, store: &ContextStore) -> Result<String> {
        let prior: Vec<PriorOutput> = store
            .iter()
            .map(|(id, output)| PriorOutput {
                stage: id.as_str(),
                output: output.to_string(),
            })
            .collect();
        let outputs: BTreeMap<&str, &str> = prior.iter().map(|p| (p.stage, p.output.as_str())).collect();

        let instructions = self.env.render_str(
            stage.instructions,
            context! { symbol => symbol, outputs => outputs },
        )?;

        let task = self.env.get_template(TASK_TEMPLATE)?.render(context! {
            instructions => instructions,
            expected_output => stage.expected_output,
            prior => prior,
        })?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageOutput;
    use crate::error::PipelineError;
    use crate::stage::{StageId, roster};

    #[test]
    fn first_stage_has_no_context_block() {
        let renderer = TaskRenderer::new().unwrap();
        let task = renderer.render(&roster()[0], "AAPL", &ContextStore::new()).unwrap();

        assert!(task.starts_with("Conduct thorough research on AAPL including:"));
        assert!(task.contains("Expected output: A comprehensive research report"));
        assert!(!task.contains("Use the following analysis data as context"));
    }

    #[test]
    fn later_stages_embed_every_prior_output() {
        let renderer = TaskRenderer::new().unwrap();
        let mut store = ContextStore::new();
        store
            .record(StageId::Researcher, StageOutput::Text("Research: margins expanding.".into()))
            .unwrap();
        store
            .record(StageId::SentimentAnalyst, StageOutput::Text("Sentiment: cautious.".into()))
            .unwrap();

        let task = renderer.render(&roster()[2], "MSFT", &store).unwrap();
        assert!(task.contains("Synthesize all research data on MSFT"));
        assert!(task.contains("Research: margins expanding."));
        assert!(task.contains("Sentiment: cautious."));
        assert!(task.find("=== Researcher ===") < task.find("=== SentimentAnalyst ==="));
    }

    #[test]
    fn trailing_whitespace_of_the_last_output_is_kept() {
        let renderer = TaskRenderer::new().unwrap();
        let mut store = ContextStore::new();
        store
            .record(StageId::Researcher, StageOutput::Text("Research done.\n".into()))
            .unwrap();
        store
            .record(StageId::SentimentAnalyst, StageOutput::Text("Mood: upbeat.\n\n".into()))
            .unwrap();

        let task = renderer.render(&roster()[2], "MSFT", &store).unwrap();
        assert!(task.contains("=== Researcher ===\nResearch done.\n\n\n=== SentimentAnalyst ==="));
        assert!(task.ends_with("=== SentimentAnalyst ===\nMood: upbeat.\n\n"));
    }

    #[test]
    fn first_stage_task_ends_with_expected_output() {
        let renderer = TaskRenderer::new().unwrap();
        let stage = &roster()[0];
        let task = renderer.render(stage, "AAPL", &ContextStore::new()).unwrap();

        assert!(task.ends_with(stage.expected_output));
    }

    #[test]
    fn structured_outputs_render_as_json() {
        let renderer = TaskRenderer::new().unwrap();
        let mut store = ContextStore::new();
        store
            .record(
                StageId::Researcher,
                StageOutput::Structured(serde_json::json!({ "rating": "buy" })),
            )
            .unwrap();

        let task = renderer.render(&roster()[1], "AAPL", &store).unwrap();
        assert!(task.contains("\"rating\": \"buy\""));
    }

    #[test]
    fn output_html_is_not_escaped() {
        let renderer = TaskRenderer::new().unwrap();
        let mut store = ContextStore::new();
        store
            .record(StageId::Researcher, StageOutput::Text("P/E < 20 & \"cheap\"".into()))
            .unwrap();

        let task = renderer.render(&roster()[1], "AAPL", &store).unwrap();
        assert!(task.contains("P/E < 20 & \"cheap\""));
    }

    #[test]
    fn reference_to_unrecorded_stage_fails() {
        let renderer = TaskRenderer::new().unwrap();
        let mut stage = roster()[0].clone();
        stage.instructions = "Revisit {{ outputs.InvestmentStrategist }} for {{ symbol }}";

        let err = renderer.render(&stage, "AAPL", &ContextStore::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Template(_)));
    }

    #[test]
    fn reference_to_recorded_stage_renders() {
        let renderer = TaskRenderer::new().unwrap();
        let mut store = ContextStore::new();
        store
            .record(StageId::Researcher, StageOutput::Text("earlier findings".into()))
            .unwrap();
        let mut stage = roster()[1].clone();
        stage.instructions = "Build on: {{ outputs.Researcher }}";

        let task = renderer.render(&stage, "AAPL", &store).unwrap();
        assert!(task.starts_with("Build on: earlier findings"));
    }
}
