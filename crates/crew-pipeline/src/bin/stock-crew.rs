//! Run one four-stage analysis from the command line
//!
//! ```bash
//! export GEMINI_API_KEY="..."
//! cargo run --bin stock-crew -- AAPL
//! ```

use clap::Parser;
use crew_pipeline::{CrewConfig, Pipeline};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "stock-crew")]
#[command(about = "Multi-stage LLM analysis of a stock", long_about = None)]
struct Args {
    /// Ticker symbol to analyze, e.g. AAPL
    symbol: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    crew_core::logging::init_tracing("warn,crew_pipeline=info,crew_market=info", args.log_json);

    let pipeline = Pipeline::from_config(CrewConfig::from_env()?)?;

    let report = match pipeline.run(&args.symbol).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Analysis failed");
            eprintln!("Analysis of {} failed: {e}", args.symbol);
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (stage, output) in report.iter() {
            println!("\n=== {stage} ===");
            println!("{output}");
        }
    }

    Ok(())
}
