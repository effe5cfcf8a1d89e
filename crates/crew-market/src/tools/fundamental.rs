//! Fundamental analysis: valuation, balance sheet and analyst view

use crate::api::{CompanyProfile, MarketData};
use crate::error::MarketError;
use crate::outcome::{FailureShape, ToolFailure, ToolOutcome};
use crate::tools::{TickerParams, tool_names};
use async_trait::async_trait;
use crew_core::{Result as CoreResult, Tool, schema};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// Fundamental metrics for one company; unknown metrics are `null`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalReport {
    pub ticker: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    #[serde(rename = "52_week_high")]
    pub week_52_high: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub week_52_low: Option<f64>,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub net_income_growth: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub analyst_recommendation: Option<String>,
    pub target_price: Option<f64>,
}

impl From<CompanyProfile> for FundamentalReport {
    fn from(p: CompanyProfile) -> Self {
        Self {
            company_name: p.long_name.or(p.short_name),
            ticker: p.symbol,
            sector: p.sector,
            industry: p.industry,
            market_cap: p.market_cap,
            pe_ratio: p.trailing_pe,
            forward_pe: p.forward_pe,
            peg_ratio: p.peg_ratio,
            price_to_book: p.price_to_book,
            dividend_yield: p.dividend_yield,
            beta: p.beta,
            week_52_high: p.fifty_two_week_high,
            week_52_low: p.fifty_two_week_low,
            current_ratio: p.current_ratio,
            debt_to_equity: p.debt_to_equity,
            return_on_equity: p.return_on_equity,
            return_on_assets: p.return_on_assets,
            revenue_growth: p.revenue_growth,
            net_income_growth: p.earnings_growth,
            free_cash_flow: p.free_cash_flow,
            analyst_recommendation: p.recommendation_key,
            target_price: p.target_mean_price,
        }
    }
}

/// Tool reporting valuation and financial-health metrics
pub struct FundamentalAnalysisTool {
    data: Arc<dyn MarketData>,
}

impl FundamentalAnalysisTool {
    pub fn new(data: Arc<dyn MarketData>) -> Self {
        Self { data }
    }

    pub async fn run(&self, ticker: &str) -> ToolOutcome<FundamentalReport> {
        let profile = match self.data.company_profile(ticker).await {
            Ok(profile) if is_resolved(&profile) => profile,
            Ok(_) => {
                let e = MarketError::DataUnavailable {
                    symbol: ticker.to_string(),
                    reason: "no company data".to_string(),
                };
                return failure(ticker, &e);
            }
            Err(e) => return failure(ticker, &e),
        };

        info!(ticker, sector = ?profile.sector, "Fundamental analysis completed");
        ToolOutcome::Success(FundamentalReport::from(profile))
    }
}

/// A profile with no name, size or price describes nothing
fn is_resolved(profile: &CompanyProfile) -> bool {
    profile.short_name.is_some()
        || profile.long_name.is_some()
        || profile.market_cap.is_some()
        || profile.current_price.is_some()
}

fn failure(ticker: &str, e: &MarketError) -> ToolOutcome<FundamentalReport> {
    warn!(ticker, error = %e, "Fundamental analysis failed");
    ToolOutcome::Failure(ToolFailure::new(
        ticker,
        format!("Error retrieving fundamentals for {ticker}: {e}"),
        FailureShape::Status,
    ))
}

#[async_trait]
impl Tool for FundamentalAnalysisTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: TickerParams = serde_json::from_value(params)?;
        let ticker = params.normalized_ticker();
        Ok(self
            .run(&ticker)
            .await
            .into_value(&ticker, FailureShape::Status))
    }

    fn name(&self) -> &str {
        tool_names::FUNDAMENTAL
    }

    fn description(&self) -> &str {
        "Fundamental analysis of a stock: company identity, valuation multiples, dividend yield, \
         beta, 52-week range, liquidity and leverage ratios, profitability, growth, free cash \
         flow and the analyst consensus with target price."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "ticker": schema::string("Stock ticker symbol, e.g. AAPL") }),
            &["ticker"],
        )
    }
}
