//! End-to-end behaviour of the pipeline with a recording narrative backend

use async_trait::async_trait;
use crew_core::{Tool, ToolRegistry};
use crew_llm::{LLMError, NarrativeBackend, NarrativeRequest};
use crew_pipeline::{Pipeline, PipelineError, StageId, StageOutput};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

const TOOL_NAMES: [&str; 5] = [
    "technical_analysis",
    "fundamental_analysis",
    "sentiment_analysis",
    "risk_assessment",
    "competitor_analysis",
];

struct StubTool(&'static str);

#[async_trait]
impl Tool for StubTool {
    async fn execute(&self, _params: Value) -> crew_core::Result<Value> {
        Ok(json!({ "tool": self.0 }))
    }

    fn name(&self) -> &str {
        self.0
    }

    fn description(&self) -> &str {
        "stub"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }
}

fn registry() -> ToolRegistry {
    TOOL_NAMES
        .into_iter()
        .fold(ToolRegistry::new(), |r, name| r.with_tool(Arc::new(StubTool(name))))
}

#[derive(Debug, Clone)]
struct Call {
    system: String,
    prompt: String,
    tools: Vec<String>,
}

type Reply = Box<dyn Fn(usize) -> crew_llm::Result<String> + Send + Sync>;

/// Records every request and answers with `reply(call_index)`
struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    reply: Reply,
}

impl RecordingBackend {
    fn new(reply: impl Fn(usize) -> crew_llm::Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeBackend for RecordingBackend {
    async fn generate(&self, request: &NarrativeRequest, tools: &ToolRegistry) -> crew_llm::Result<String> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                system: request.system.clone(),
                prompt: request.prompt.clone(),
                tools: tools.names().into_iter().map(str::to_string).collect(),
            });
            calls.len() - 1
        };
        (self.reply)(index)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn narrative(index: usize) -> crew_llm::Result<String> {
    // Chat replies usually end with a newline; it must survive into later prompts
    Ok(format!("Narrative #{index}: findings for stage {index}.\n"))
}

fn pipeline(backend: Arc<RecordingBackend>) -> Pipeline {
    Pipeline::new(backend, registry(), "LLM unavailable").unwrap()
}

#[tokio::test]
async fn report_has_four_stages_in_order() {
    let backend = RecordingBackend::new(narrative);
    let report = pipeline(backend.clone()).run("AAPL").await.unwrap();

    assert_eq!(report.stage_ids(), StageId::ALL);
    assert_eq!(report.len(), 4);
    assert_eq!(
        report.get(StageId::InvestmentStrategist),
        Some(&StageOutput::Text("Narrative #3: findings for stage 3.\n".to_string()))
    );

    let systems: Vec<String> = backend.calls().into_iter().map(|c| c.system).collect();
    assert!(systems[0].contains("Stock Market Researcher"));
    assert!(systems[1].contains("Sentiment Analyst"));
    assert!(systems[2].contains("Financial Analyst"));
    assert!(systems[3].contains("Investment Strategist"));
}

#[tokio::test]
async fn each_stage_sees_every_prior_output_verbatim() {
    let backend = RecordingBackend::new(narrative);
    pipeline(backend.clone()).run("MSFT").await.unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 4);
    for (index, call) in calls.iter().enumerate() {
        assert!(call.prompt.contains("MSFT"));
        for earlier in 0..index {
            let text = narrative(earlier).unwrap();
            assert!(
                call.prompt.contains(&text),
                "stage {index} is missing output of stage {earlier}"
            );
        }
        if index > 0 {
            let last = narrative(index - 1).unwrap();
            assert!(call.prompt.ends_with(&last));
        }
        for later in index..4 {
            assert!(!call.prompt.contains(&format!("Narrative #{later}:")));
        }
    }
}

#[tokio::test]
async fn stages_are_offered_only_their_tools() {
    let backend = RecordingBackend::new(narrative);
    pipeline(backend.clone()).run("AAPL").await.unwrap();

    let tools: Vec<Vec<String>> = backend.calls().into_iter().map(|c| c.tools).collect();
    assert_eq!(
        tools[0],
        ["technical_analysis", "fundamental_analysis", "competitor_analysis"]
    );
    assert_eq!(tools[1], ["sentiment_analysis"]);
    assert_eq!(
        tools[2],
        ["technical_analysis", "fundamental_analysis", "risk_assessment"]
    );
    assert!(tools[3].is_empty());
}

#[tokio::test]
async fn backend_outage_degrades_one_stage_and_continues() {
    let backend = RecordingBackend::new(|index| {
        if index == 1 {
            Err(LLMError::RequestFailed("HTTP 503".to_string()))
        } else {
            narrative(index)
        }
    });
    let report = pipeline(backend.clone()).run("AAPL").await.unwrap();

    assert_eq!(report.len(), 4);
    assert_eq!(
        report.get(StageId::SentimentAnalyst),
        Some(&StageOutput::Text("LLM unavailable".to_string()))
    );
    let calls = backend.calls();
    assert!(calls[2].prompt.contains("LLM unavailable"));
    assert!(calls[3].prompt.contains("LLM unavailable"));
}

#[tokio::test]
async fn unclassified_backend_failure_aborts_the_run() {
    let backend = RecordingBackend::new(|index| {
        if index == 2 {
            Err(LLMError::Internal("invariant broken".to_string()))
        } else {
            narrative(index)
        }
    });
    let err = pipeline(backend.clone()).run("AAPL").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Backend {
            stage: StageId::FinancialAnalyst,
            ..
        }
    ));
    assert_eq!(backend.calls().len(), 3);
}

#[tokio::test]
async fn json_output_is_kept_structured() {
    let backend = RecordingBackend::new(|index| {
        if index == 0 {
            Ok("```json\n{\"recommendation\": \"buy\", \"confidence\": 0.8}\n```".to_string())
        } else {
            narrative(index)
        }
    });
    let report = pipeline(backend.clone()).run("AAPL").await.unwrap();

    assert_eq!(
        report.get(StageId::Researcher),
        Some(&StageOutput::Structured(
            json!({ "recommendation": "buy", "confidence": 0.8 })
        ))
    );
    assert!(backend.calls()[1].prompt.contains("\"recommendation\": \"buy\""));

    let serialized = serde_json::to_value(&report).unwrap();
    assert_eq!(
        serialized["individual_analyses"]["Researcher"]["recommendation"],
        "buy"
    );
    assert!(serialized["individual_analyses"]["SentimentAnalyst"].is_string());
}

#[tokio::test]
async fn empty_symbol_is_rejected_before_any_stage() {
    let backend = RecordingBackend::new(narrative);
    let err = pipeline(backend.clone()).run("   ").await.unwrap_err();

    assert!(matches!(err, PipelineError::EmptySymbol));
    assert!(backend.calls().is_empty());
}

#[test]
fn registry_missing_a_stage_tool_is_rejected() {
    let partial = ToolRegistry::new().with_tool(Arc::new(StubTool("sentiment_analysis")));
    let result = Pipeline::new(RecordingBackend::new(narrative), partial, "LLM unavailable");

    assert!(matches!(
        result,
        Err(PipelineError::Tool(crew_core::Error::ToolNotFound(_)))
    ));
}
