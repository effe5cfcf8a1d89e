//! Stage outputs accumulated during one run

use crate::error::{PipelineError, Result};
use crate::stage::StageId;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// What a stage produced, text or a JSON object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    Text(String),
    Structured(Value),
}

impl StageOutput {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

impl fmt::Display for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => match serde_json::to_string_pretty(value) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{value}"),
            },
        }
    }
}

/// Decides whether raw backend text is a structured result
pub struct OutputClassifier {
    fenced: Regex,
}

impl OutputClassifier {
    pub fn new() -> Result<Self> {
        let fenced = Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$")
            .map_err(|e| PipelineError::Config(format!("invalid output pattern: {e}")))?;
        Ok(Self { fenced })
    }

    /// A JSON object, bare or alone in a fenced code block, is structured;
    /// anything else stays text exactly as produced.
    pub fn classify(&self, raw: String) -> StageOutput {
        let trimmed = raw.trim();
        let candidate = self
            .fenced
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map_or(trimmed, |m| m.as_str());

        if candidate.starts_with('{') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
                return StageOutput::Structured(value);
            }
        }
        StageOutput::Text(raw)
    }
}

/// Ordered, append-only record of stage outputs for one run
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: Vec<(StageId, StageOutput)>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `output` for `stage`; each stage is recorded at most once
    pub fn record(&mut self, stage: StageId, output: StageOutput) -> Result<()> {
        if self.get(stage).is_some() {
            return Err(PipelineError::ContextConflict(stage));
        }
        self.entries.push((stage, output));
        Ok(())
    }

    pub fn get(&self, stage: StageId) -> Option<&StageOutput> {
        self.entries
            .iter()
            .find(|(id, _)| *id == stage)
            .map(|(_, output)| output)
    }

    /// Entries in execution order
    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageOutput)> {
        self.entries.iter().map(|(id, output)| (*id, output))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(StageId, StageOutput)> {
        self.entries
    }
}
