//! The sequential four-stage analysis

use crate::config::CrewConfig;
use crate::context::ContextStore;
use crate::error::{PipelineError, Result};
use crate::prompt::TaskRenderer;
use crate::report::{Report, ReportAssembler};
use crate::runner::StageRunner;
use crate::stage::{Stage, roster};
use crew_core::ToolRegistry;
use crew_llm::providers::{OpenAIConfig, OpenAIProvider};
use crew_llm::{ExecutorConfig, NarrativeBackend, ToolLoopBackend};
use crew_market::MarketToolkit;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// Runs Researcher, SentimentAnalyst, FinancialAnalyst and
/// InvestmentStrategist in that order, each seeing every earlier output.
///
/// A stage whose backend is unavailable records the degraded marker and the
/// run continues. Any other failure aborts the run with no partial report.
pub struct Pipeline {
    stages: [Stage; 4],
    runner: StageRunner,
    renderer: TaskRenderer,
}

impl Pipeline {
    /// Fails if a stage's allow-list names a tool `tools` does not hold
    pub fn new(
        backend: Arc<dyn NarrativeBackend>,
        tools: ToolRegistry,
        degraded_marker: impl Into<String>,
    ) -> Result<Self> {
        let runner = StageRunner::new(backend, tools, degraded_marker)?;
        let stages = roster();
        for stage in &stages {
            runner.tools_for(stage)?;
        }

        Ok(Self {
            stages,
            runner,
            renderer: TaskRenderer::new()?,
        })
    }

    /// Wire the OpenAI-compatible backend and the market toolkit from `config`
    pub fn from_config(config: CrewConfig) -> Result<Self> {
        config.validate()?;
        let llm = &config.llm;

        let provider = OpenAIProvider::with_config(
            OpenAIConfig::new(llm.api_key.clone())
                .with_api_base(llm.api_base.clone())
                .with_timeout(llm.timeout.as_secs()),
        )
        .map_err(|e| PipelineError::Config(e.to_string()))?;

        let backend = ToolLoopBackend::new(
            Arc::new(provider),
            ExecutorConfig {
                max_iterations: llm.max_tool_iterations,
                model: llm.model.clone(),
                max_tokens: llm.max_tokens,
                temperature: Some(llm.temperature),
            },
        );

        let toolkit = MarketToolkit::from_config(config.market.clone())?;
        info!(model = %llm.model, api_base = %llm.api_base, "Pipeline configured");
        Self::new(Arc::new(backend), toolkit.registry(), config.degraded_marker)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Analyze `symbol`. Stages run strictly one after another.
    pub async fn run(&self, symbol: &str) -> Result<Report> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(PipelineError::EmptySymbol);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id, symbol);
        self.run_stages(symbol).instrument(span).await
    }

    async fn run_stages(&self, symbol: &str) -> Result<Report> {
        let mut store = ContextStore::new();

        for (index, stage) in self.stages.iter().enumerate() {
            info!(stage = %stage.id, index, "Stage started");
            let task = self.renderer.render(stage, symbol, &store)?;
            let invocation = self.runner.execute(stage, symbol, task).await?;

            info!(
                stage = %invocation.stage,
                status = %invocation.status,
                elapsed_ms = invocation.elapsed.as_millis() as u64,
                structured = invocation.output.is_structured(),
                "Stage finished"
            );
            store.record(invocation.stage, invocation.output)?;
        }

        info!(stages = store.len(), "Analysis completed");
        Ok(ReportAssembler::assemble(store))
    }
}
