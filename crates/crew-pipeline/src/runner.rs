//! Runs one stage against the narrative backend

use crate::context::{OutputClassifier, StageOutput};
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StageId};
use crew_core::ToolRegistry;
use crew_llm::{NarrativeBackend, NarrativeRequest};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    /// The backend was unavailable and the output is the degraded marker
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
        })
    }
}

/// Record of one stage run for one symbol
#[derive(Debug, Clone)]
pub struct StageInvocation {
    pub stage: StageId,
    pub symbol: String,
    pub task_description: String,
    pub allowed_tools: Vec<String>,
    pub output: StageOutput,
    pub status: StageStatus,
    pub elapsed: Duration,
}

/// Executes stages one at a time, offering each only its allowed tools
pub struct StageRunner {
    backend: Arc<dyn NarrativeBackend>,
    tools: ToolRegistry,
    classifier: OutputClassifier,
    degraded_marker: String,
}

impl StageRunner {
    pub fn new(
        backend: Arc<dyn NarrativeBackend>,
        tools: ToolRegistry,
        degraded_marker: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            tools,
            classifier: OutputClassifier::new()?,
            degraded_marker: degraded_marker.into(),
        })
    }

    /// The registry restricted to `stage`'s allow-list
    pub fn tools_for(&self, stage: &Stage) -> Result<ToolRegistry> {
        Ok(self.tools.scoped(stage.tools)?)
    }

    /// Run `stage` once. Known backend outages yield the degraded marker
    /// with [`StageStatus::Failed`]; any other backend error is returned.
    pub async fn execute(
        &self,
        stage: &Stage,
        symbol: &str,
        task_description: String,
    ) -> Result<StageInvocation> {
        let tools = self.tools_for(stage)?;
        let request = NarrativeRequest::new(stage.persona.system_prompt(), task_description);
        let start = Instant::now();

        debug!(
            stage = %stage.id,
            backend = self.backend.name(),
            tools = ?tools.names(),
            "Invoking narrative backend"
        );

        let (output, status) = match self.backend.generate(&request, &tools).await {
            Ok(text) => (self.classifier.classify(text), StageStatus::Ok),
            Err(e) if e.is_degradable() => {
                warn!(stage = %stage.id, error = %e, "Narrative backend unavailable, using degraded output");
                (StageOutput::Text(self.degraded_marker.clone()), StageStatus::Failed)
            }
            Err(e) => {
                return Err(PipelineError::Backend {
                    stage: stage.id,
                    source: e,
                });
            }
        };

        Ok(StageInvocation {
            stage: stage.id,
            symbol: symbol.to_string(),
            task_description: request.prompt,
            allowed_tools: tools.names().into_iter().map(str::to_string).collect(),
            output,
            status,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::roster;
    use async_trait::async_trait;
    use crew_core::Tool;
    use crew_llm::LLMError;
    use serde_json::{Value, json};

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        async fn execute(&self, _params: Value) -> crew_core::Result<Value> {
            Ok(json!({}))
        }

        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }
    }

    fn full_registry() -> ToolRegistry {
        [
            "technical_analysis",
            "fundamental_analysis",
            "sentiment_analysis",
            "risk_assessment",
            "competitor_analysis",
        ]
        .into_iter()
        .fold(ToolRegistry::new(), |r, name| r.with_tool(Arc::new(NamedTool(name))))
    }

    struct FixedBackend(fn() -> crew_llm::Result<String>);

    #[async_trait]
    impl NarrativeBackend for FixedBackend {
        async fn generate(&self, _request: &NarrativeRequest, _tools: &ToolRegistry) -> crew_llm::Result<String> {
            (self.0)()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn runner(reply: fn() -> crew_llm::Result<String>) -> StageRunner {
        StageRunner::new(Arc::new(FixedBackend(reply)), full_registry(), "LLM unavailable").unwrap()
    }

    #[tokio::test]
    async fn records_invocation() {
        let runner = runner(|| Ok("Solid fundamentals.".to_string()));
        let stage = &roster()[0];

        let inv = runner.execute(stage, "AAPL", "task".to_string()).await.unwrap();
        assert_eq!(inv.stage, StageId::Researcher);
        assert_eq!(inv.symbol, "AAPL");
        assert_eq!(inv.task_description, "task");
        assert_eq!(
            inv.allowed_tools,
            ["technical_analysis", "fundamental_analysis", "competitor_analysis"]
        );
        assert_eq!(inv.status, StageStatus::Ok);
        assert_eq!(inv.output, StageOutput::Text("Solid fundamentals.".to_string()));
    }

    #[tokio::test]
    async fn outage_becomes_degraded_marker() {
        let runner = runner(|| Err(LLMError::RateLimitExceeded("quota".to_string())));

        let inv = runner.execute(&roster()[1], "AAPL", "task".to_string()).await.unwrap();
        assert_eq!(inv.status, StageStatus::Failed);
        assert_eq!(inv.output, StageOutput::Text("LLM unavailable".to_string()));
    }

    #[tokio::test]
    async fn unclassified_failure_is_returned() {
        let runner = runner(|| Err(LLMError::Internal("corrupt state".to_string())));

        let err = runner.execute(&roster()[2], "AAPL", "task".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Backend { stage: StageId::FinancialAnalyst, .. }
        ));
    }

    #[tokio::test]
    async fn strategist_is_offered_no_tools() {
        let runner = runner(|| Ok("Hold.".to_string()));
        let inv = runner.execute(&roster()[3], "AAPL", "task".to_string()).await.unwrap();
        assert!(inv.allowed_tools.is_empty());
    }

    #[test]
    fn missing_tool_is_an_error() {
        let runner = StageRunner::new(
            Arc::new(FixedBackend(|| Ok(String::new()))),
            ToolRegistry::new(),
            "LLM unavailable",
        )
        .unwrap();
        assert!(matches!(
            runner.tools_for(&roster()[0]),
            Err(PipelineError::Tool(crew_core::Error::ToolNotFound(_)))
        ));
    }
}
