//! Sequential stock analysis pipeline
//!
//! Four analyst stages run in a fixed order for one ticker. Each stage is a
//! persona, a task template and an allow-list of market tools; the narrative
//! backend writes the stage's output, calling only the allowed tools. Every
//! later stage's task embeds the full text of all earlier outputs.
//!
//! ```no_run
//! use crew_pipeline::{CrewConfig, Pipeline};
//!
//! # async fn demo() -> crew_pipeline::Result<()> {
//! let pipeline = Pipeline::from_config(CrewConfig::from_env()?)?;
//! let report = pipeline.run("AAPL").await?;
//! for (stage, output) in report.iter() {
//!     println!("=== {stage} ===\n{output}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod stage;

pub use config::{CrewConfig, LlmConfig};
pub use context::{ContextStore, StageOutput};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use report::{Report, ReportAssembler};
pub use runner::{StageInvocation, StageRunner, StageStatus};
pub use stage::{Persona, Stage, StageId};
