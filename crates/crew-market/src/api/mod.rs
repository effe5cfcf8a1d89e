//! Market data provider boundary and its implementations

pub mod finnhub;
pub mod yahoo;

pub use finnhub::FinnhubClient;
pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Company identity, valuation and balance-sheet figures.
///
/// Every metric is optional; providers leave out whatever they do not report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub profit_margins: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub recommendation_key: Option<String>,
    pub target_mean_price: Option<f64>,
}

impl CompanyProfile {
    /// Short name, then long name, then the symbol itself
    pub fn display_name(&self) -> String {
        self.short_name
            .as_ref()
            .or(self.long_name.as_ref())
            .cloned()
            .unwrap_or_else(|| self.symbol.clone())
    }
}

/// A news headline and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

/// External market data provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Daily bars for `range` (e.g. "2y"), oldest first
    async fn price_history(&self, symbol: &str, range: &str) -> Result<Vec<Bar>>;

    /// Identity and fundamentals for a symbol
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile>;

    /// Symbols the provider considers related to `symbol`
    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>>;

    /// Constituent symbols of a fund, largest first
    async fn fund_holdings(&self, symbol: &str) -> Result<Vec<String>>;
}

/// A source of news headlines for sentiment scoring
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Label reported in the sentiment result's `sources`
    fn source_name(&self) -> &str;

    /// Up to `limit` recent headlines about `symbol`
    async fn headlines(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>>;
}
