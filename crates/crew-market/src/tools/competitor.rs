//! Competitor discovery and peer comparison

use crate::api::{CompanyProfile, MarketData};
use crate::error::{MarketError, Result};
use crate::outcome::{FailureShape, ToolFailure, ToolOutcome};
use crate::tools::tool_names;
use async_trait::async_trait;
use crew_core::{Result as CoreResult, Tool, schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// SPDR sector ETF whose holdings stand in for peers of `sector`
pub fn sector_etf(sector: &str) -> Option<&'static str> {
    match sector {
        "Technology" => Some("XLK"),
        "Healthcare" => Some("XLV"),
        "Financial Services" => Some("XLF"),
        "Consumer Cyclical" => Some("XLY"),
        "Energy" => Some("XLE"),
        "Industrials" => Some("XLI"),
        "Utilities" => Some("XLU"),
        "Materials" => Some("XLB"),
        "Real Estate" => Some("XLRE"),
        "Communication Services" => Some("XLC"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainStock {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub industry: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Competitor {
    pub ticker: String,
    pub name: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub profit_margins: Option<f64>,
    pub beta: Option<f64>,
}

impl From<CompanyProfile> for Competitor {
    fn from(p: CompanyProfile) -> Self {
        Self {
            name: p.short_name.or(p.long_name),
            ticker: p.symbol,
            market_cap: p.market_cap,
            pe_ratio: p.trailing_pe,
            revenue_growth: p.revenue_growth,
            profit_margins: p.profit_margins,
            beta: p.beta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorReport {
    pub main_stock: MainStock,
    pub competitors: Vec<Competitor>,
}

/// Merge candidate lists in order, dropping `ticker` and repeats, keeping at most `limit`
fn select_candidates(ticker: &str, lists: &[Vec<String>], limit: usize) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(limit);
    for symbol in lists.iter().flatten() {
        if selected.len() == limit {
            break;
        }
        if symbol != ticker && !selected.contains(symbol) {
            selected.push(symbol.clone());
        }
    }
    selected
}

#[derive(Debug, Deserialize)]
struct CompetitorParams {
    ticker: String,
    num_competitors: Option<usize>,
}

/// Tool finding a company's peers and comparing their key metrics
pub struct CompetitorAnalysisTool {
    data: Arc<dyn MarketData>,
    default_count: usize,
}

impl CompetitorAnalysisTool {
    pub fn new(data: Arc<dyn MarketData>, default_count: usize) -> Self {
        Self {
            data,
            default_count,
        }
    }

    pub async fn run(&self, ticker: &str, count: usize) -> ToolOutcome<CompetitorReport> {
        match self.analyze(ticker, count).await {
            Ok(report) => {
                info!(ticker, competitors = report.competitors.len(), "Competitor analysis completed");
                ToolOutcome::Success(report)
            }
            Err(e) => {
                warn!(ticker, error = %e, "Competitor analysis failed");
                ToolOutcome::Failure(ToolFailure::new(ticker, e.to_string(), FailureShape::Status))
            }
        }
    }

    async fn analyze(&self, ticker: &str, count: usize) -> Result<CompetitorReport> {
        let profile = self.data.company_profile(ticker).await?;
        let name = profile.display_name();
        let (Some(sector), Some(industry)) = (profile.sector, profile.industry) else {
            return Err(MarketError::DataUnavailable {
                symbol: ticker.to_string(),
                reason: format!("could not determine sector/industry for {ticker}"),
            });
        };

        let mut lists = Vec::new();
        match self.data.recommended_symbols(ticker).await {
            Ok(symbols) => lists.push(symbols),
            Err(e) => warn!(ticker, error = %e, "Recommended symbols unavailable"),
        }

        let found = select_candidates(ticker, &lists, count).len();
        if found < count {
            if let Some(etf) = sector_etf(&sector) {
                match self.data.fund_holdings(etf).await {
                    Ok(holdings) => lists.push(holdings),
                    Err(e) => warn!(ticker, etf, error = %e, "Sector ETF holdings unavailable"),
                }
            }
        }

        let mut competitors = Vec::new();
        for symbol in select_candidates(ticker, &lists, count) {
            match self.data.company_profile(&symbol).await {
                Ok(profile) => competitors.push(Competitor::from(profile)),
                Err(e) => debug!(competitor = %symbol, error = %e, "Skipping competitor"),
            }
        }

        Ok(CompetitorReport {
            main_stock: MainStock {
                ticker: ticker.to_string(),
                name,
                sector,
                industry,
            },
            competitors,
        })
    }
}

#[async_trait]
impl Tool for CompetitorAnalysisTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: CompetitorParams = serde_json::from_value(params)?;
        let ticker = params.ticker.trim().to_uppercase();
        let count = params.num_competitors.unwrap_or(self.default_count);
        Ok(self
            .run(&ticker, count)
            .await
            .into_value(&ticker, FailureShape::Status))
    }

    fn name(&self) -> &str {
        tool_names::COMPETITOR
    }

    fn description(&self) -> &str {
        "Identify a company's main competitors and compare their market cap, P/E ratio, \
         revenue growth, profit margins and beta. Also reports the company's own sector \
         and industry."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "ticker": schema::string("Stock ticker symbol, e.g. AAPL"),
                "num_competitors": schema::integer("Number of competitors to return (default 5)"),
            }),
            &["ticker"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketData;
    use mockall::predicate::eq;

    fn profile(symbol: &str, sector: Option<&str>) -> CompanyProfile {
        CompanyProfile {
            symbol: symbol.to_string(),
            short_name: Some(format!("{symbol} Corp")),
            sector: sector.map(str::to_string),
            industry: sector.map(|_| "Software".to_string()),
            market_cap: Some(1.0e9),
            ..Default::default()
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn sector_etf_map() {
        assert_eq!(sector_etf("Technology"), Some("XLK"));
        assert_eq!(sector_etf("Real Estate"), Some("XLRE"));
        assert_eq!(sector_etf("Crypto"), None);
    }

    #[test]
    fn candidates_keep_first_seen_order() {
        let lists = vec![symbols(&["MSFT", "AAPL", "GOOG"]), symbols(&["GOOG", "NVDA", "META"])];
        assert_eq!(
            select_candidates("AAPL", &lists, 3),
            symbols(&["MSFT", "GOOG", "NVDA"])
        );
    }

    #[tokio::test]
    async fn tops_up_from_sector_etf() {
        let mut data = MockMarketData::new();
        data.expect_company_profile()
            .returning(|s| Ok(profile(s, Some("Technology"))));
        data.expect_recommended_symbols()
            .returning(|_| Ok(symbols(&["MSFT"])));
        data.expect_fund_holdings()
            .with(eq("XLK"))
            .times(1)
            .returning(|_| Ok(symbols(&["AAPL", "MSFT", "NVDA", "AVGO"])));
        let tool = CompetitorAnalysisTool::new(Arc::new(data), 5);

        let out = tool.execute(json!({ "ticker": "AAPL", "num_competitors": 3 })).await.unwrap();
        assert_eq!(out["main_stock"]["sector"], "Technology");
        assert_eq!(out["main_stock"]["name"], "AAPL Corp");
        let tickers: Vec<&str> = out["competitors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["ticker"].as_str().unwrap())
            .collect();
        assert_eq!(tickers, ["MSFT", "NVDA", "AVGO"]);
    }

    #[tokio::test]
    async fn skips_competitors_that_fail_to_load() {
        let mut data = MockMarketData::new();
        data.expect_company_profile().returning(|s| match s {
            "BAD" => Err(MarketError::ApiError("HTTP 404".to_string())),
            _ => Ok(profile(s, Some("Energy"))),
        });
        data.expect_recommended_symbols()
            .returning(|_| Ok(symbols(&["BAD", "CVX"])));
        data.expect_fund_holdings().never();
        let tool = CompetitorAnalysisTool::new(Arc::new(data), 2);

        let ToolOutcome::Success(report) = tool.run("XOM", 2).await else {
            panic!("expected a report");
        };
        assert_eq!(report.competitors.len(), 1);
        assert_eq!(report.competitors[0].ticker, "CVX");
    }

    #[tokio::test]
    async fn missing_sector_is_error_payload() {
        let mut data = MockMarketData::new();
        data.expect_company_profile().returning(|s| Ok(profile(s, None)));
        let tool = CompetitorAnalysisTool::new(Arc::new(data), 5);

        let out = tool.execute(json!({ "ticker": "ZZZINVALID" })).await.unwrap();
        assert_eq!(out["status"], "error");
        assert_eq!(out["ticker"], "ZZZINVALID");
        assert!(out["message"].as_str().unwrap().contains("sector/industry"));
    }
}
