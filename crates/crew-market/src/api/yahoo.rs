//! Yahoo Finance client
//!
//! Price history goes through `yahoo_finance_api`. Company profiles, related
//! symbols, fund holdings and news headlines come from the JSON endpoints the
//! crate does not wrap.

use super::{Bar, CompanyProfile, Headline, MarketData, NewsSource};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

const QUERY_BASE: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const PROFILE_MODULES: &str =
    "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData";

/// Yahoo Finance API client
pub struct YahooFinanceClient {
    http: Client,
    crumb: OnceCell<Option<String>>,
}

impl YahooFinanceClient {
    /// Create a new client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            crumb: OnceCell::new(),
        })
    }

    /// Daily bars between two instants
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| MarketError::YahooFinanceError(e.to_string()))?;

        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| MarketError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| MarketError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| MarketError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| MarketError::YahooFinanceError(e.to_string()))?;

        Ok(quotes
            .iter()
            .filter(|q| q.close.is_finite() && q.close > 0.0)
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some(Bar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect())
    }

    async fn crumb(&self) -> Option<&str> {
        self.crumb
            .get_or_init(|| async {
                match self.fetch_crumb().await {
                    Ok(crumb) => Some(crumb),
                    Err(e) => {
                        warn!(error = %e, "Could not obtain Yahoo crumb, continuing without it");
                        None
                    }
                }
            })
            .await
            .as_deref()
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // Sets the session cookie the crumb is bound to; the status is irrelevant
        let _ = self.http.get("https://fc.yahoo.com").send().await;
        let crumb = self
            .http
            .get(format!("{QUERY_BASE}/v1/test/getcrumb"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        if crumb.is_empty() || crumb.contains('<') {
            return Err(MarketError::ApiError("empty crumb".to_string()));
        }
        Ok(crumb)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut query = query.to_vec();
        if let Some(crumb) = self.crumb().await {
            query.push(("crumb", crumb.to_string()));
        }

        debug!(url, "Yahoo request");
        let response = self.http.get(url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(MarketError::ApiError(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<SummaryResult> {
        let url = format!("{QUERY_BASE}/v10/finance/quoteSummary/{symbol}");
        let body: QuoteSummaryResponse = self
            .get_json(&url, &[("modules", modules.to_string())])
            .await?;

        if let Some(error) = body.quote_summary.error {
            return Err(MarketError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: error.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        body.quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| MarketError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty quote summary".to_string(),
            })
    }
}

/// Start date for a history range ending at `end`
pub(crate) fn range_start(range: &str, end: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let days = match range {
        "1mo" => 30,
        "3mo" => 90,
        "6mo" => 180,
        "1y" => 365,
        "2y" => 730,
        "5y" => 1825,
        "10y" => 3650,
        "max" => 36500,
        "ytd" => {
            return NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
                .ok_or_else(|| MarketError::InvalidRange(range.to_string()));
        }
        _ => return Err(MarketError::InvalidRange(range.to_string())),
    };
    Ok(end - ChronoDuration::days(days))
}

#[async_trait]
impl MarketData for YahooFinanceClient {
    async fn price_history(&self, symbol: &str, range: &str) -> Result<Vec<Bar>> {
        let end = Utc::now();
        let start = range_start(range, end)?;
        self.get_historical_quotes(symbol, start, end).await
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let summary = self.quote_summary(symbol, PROFILE_MODULES).await?;
        Ok(summary.into_profile(symbol))
    }

    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>> {
        let url = format!("{QUERY_BASE}/v6/finance/recommendationsbysymbol/{symbol}");
        let body: RecommendationsResponse = self.get_json(&url, &[]).await?;
        Ok(body
            .finance
            .result
            .into_iter()
            .flat_map(|r| r.recommended_symbols)
            .map(|s| s.symbol)
            .collect())
    }

    async fn fund_holdings(&self, symbol: &str) -> Result<Vec<String>> {
        let summary = self.quote_summary(symbol, "topHoldings").await?;
        Ok(summary
            .top_holdings
            .map(|t| t.holdings.into_iter().map(|h| h.symbol).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl NewsSource for YahooFinanceClient {
    fn source_name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn headlines(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>> {
        let url = format!("{QUERY_BASE}/v1/finance/search");
        let body: SearchResponse = self
            .get_json(
                &url,
                &[
                    ("q", symbol.to_string()),
                    ("quotesCount", "0".to_string()),
                    ("newsCount", limit.to_string()),
                ],
            )
            .await?;

        Ok(body
            .news
            .into_iter()
            .filter(|n| !n.title.trim().is_empty())
            .take(limit)
            .map(|n| Headline {
                title: n.title,
                source: self.source_name().to_string(),
            })
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`
#[derive(Debug, Default, Deserialize)]
struct Raw {
    raw: Option<f64>,
}

fn raw(value: Option<Raw>) -> Option<f64> {
    value.and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryResult {
    price: Option<PriceModule>,
    summary_profile: Option<ProfileModule>,
    summary_detail: Option<DetailModule>,
    default_key_statistics: Option<KeyStatsModule>,
    financial_data: Option<FinancialModule>,
    top_holdings: Option<TopHoldingsModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<Raw>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileModule {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<Raw>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<Raw>,
    dividend_yield: Option<Raw>,
    beta: Option<Raw>,
    fifty_two_week_high: Option<Raw>,
    fifty_two_week_low: Option<Raw>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatsModule {
    peg_ratio: Option<Raw>,
    price_to_book: Option<Raw>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinancialModule {
    current_price: Option<Raw>,
    current_ratio: Option<Raw>,
    debt_to_equity: Option<Raw>,
    return_on_equity: Option<Raw>,
    return_on_assets: Option<Raw>,
    revenue_growth: Option<Raw>,
    earnings_growth: Option<Raw>,
    profit_margins: Option<Raw>,
    free_cashflow: Option<Raw>,
    recommendation_key: Option<String>,
    target_mean_price: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopHoldingsModule {
    holdings: Vec<Holding>,
}

#[derive(Debug, Deserialize)]
struct Holding {
    symbol: String,
}

impl SummaryResult {
    fn into_profile(self, symbol: &str) -> CompanyProfile {
        let price = self.price.unwrap_or_default();
        let profile = self.summary_profile.unwrap_or_default();
        let detail = self.summary_detail.unwrap_or_default();
        let stats = self.default_key_statistics.unwrap_or_default();
        let fin = self.financial_data.unwrap_or_default();

        CompanyProfile {
            symbol: symbol.to_string(),
            short_name: price.short_name,
            long_name: price.long_name,
            sector: profile.sector.filter(|s| !s.is_empty()),
            industry: profile.industry.filter(|s| !s.is_empty()),
            current_price: raw(fin.current_price).or(raw(price.regular_market_price)),
            market_cap: raw(price.market_cap).or(raw(detail.market_cap)),
            trailing_pe: raw(detail.trailing_pe),
            forward_pe: raw(detail.forward_pe).or(raw(stats.forward_pe)),
            peg_ratio: raw(stats.peg_ratio),
            price_to_book: raw(stats.price_to_book),
            dividend_yield: raw(detail.dividend_yield),
            beta: raw(detail.beta),
            fifty_two_week_high: raw(detail.fifty_two_week_high),
            fifty_two_week_low: raw(detail.fifty_two_week_low),
            current_ratio: raw(fin.current_ratio),
            // Yahoo reports debt/equity as a percentage
            debt_to_equity: raw(fin.debt_to_equity).map(|v| v / 100.0),
            return_on_equity: raw(fin.return_on_equity),
            return_on_assets: raw(fin.return_on_assets),
            revenue_growth: raw(fin.revenue_growth),
            earnings_growth: raw(fin.earnings_growth),
            profit_margins: raw(fin.profit_margins),
            free_cash_flow: raw(fin.free_cashflow),
            recommendation_key: fin.recommendation_key.filter(|k| k != "none"),
            target_mean_price: raw(fin.target_mean_price),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    finance: RecommendationsFinance,
}

#[derive(Debug, Deserialize)]
struct RecommendationsFinance {
    #[serde(default)]
    result: Vec<RecommendationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResult {
    #[serde(default)]
    recommended_symbols: Vec<RecommendedSymbol>,
}

#[derive(Debug, Deserialize)]
struct RecommendedSymbol {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchNews {
    #[serde(default)]
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_start() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!((end - range_start("2y", end).unwrap()).num_days(), 730);
        assert_eq!((end - range_start("5y", end).unwrap()).num_days(), 1825);
        assert_eq!(range_start("ytd", end).unwrap().month(), 1);
        assert!(matches!(
            range_start("7w", end),
            Err(MarketError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_profile_from_quote_summary() {
        let body: QuoteSummaryResponse = serde_json::from_value(json!({
            "quoteSummary": {
                "result": [{
                    "price": {"shortName": "Apple Inc.", "marketCap": {"raw": 3.0e12, "fmt": "3T"}},
                    "summaryProfile": {"sector": "Technology", "industry": "Consumer Electronics"},
                    "summaryDetail": {"trailingPE": {"raw": 31.2}, "beta": {"raw": 1.25}, "dividendYield": {}},
                    "defaultKeyStatistics": {"pegRatio": {"raw": 2.1}},
                    "financialData": {"debtToEquity": {"raw": 150.0}, "recommendationKey": "buy", "freeCashflow": {"raw": 9.0e10}}
                }],
                "error": null
            }
        }))
        .unwrap();

        let summary = body.quote_summary.result.unwrap().into_iter().next().unwrap();
        let profile = summary.into_profile("AAPL");
        assert_eq!(profile.display_name(), "Apple Inc.");
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.market_cap, Some(3.0e12));
        assert_eq!(profile.trailing_pe, Some(31.2));
        assert_eq!(profile.dividend_yield, None);
        assert_eq!(profile.debt_to_equity, Some(1.5));
        assert_eq!(profile.recommendation_key.as_deref(), Some("buy"));
        assert_eq!(profile.free_cash_flow, Some(9.0e10));
    }

    #[test]
    fn test_recommendations_parse() {
        let body: RecommendationsResponse = serde_json::from_value(json!({
            "finance": {"result": [{"symbol": "AAPL", "recommendedSymbols": [
                {"symbol": "MSFT", "score": 0.3}, {"symbol": "GOOG", "score": 0.2}
            ]}]}
        }))
        .unwrap();
        let symbols: Vec<String> = body
            .finance
            .result
            .into_iter()
            .flat_map(|r| r.recommended_symbols)
            .map(|s| s.symbol)
            .collect();
        assert_eq!(symbols, vec!["MSFT", "GOOG"]);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_price_history() {
        let client = YahooFinanceClient::new(Duration::from_secs(30)).unwrap();
        let bars = client.price_history("AAPL", "1mo").await.unwrap();
        assert!(!bars.is_empty());
        assert!(bars.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_company_profile() {
        let client = YahooFinanceClient::new(Duration::from_secs(30)).unwrap();
        let profile = client.company_profile("AAPL").await.unwrap();
        assert!(profile.sector.is_some());
    }
}
