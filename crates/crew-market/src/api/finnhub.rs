//! Finnhub company-news client, used as a second headline source

use super::{Headline, NewsSource};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const FINNHUB_BASE: &str = "https://finnhub.io/api/v1";
const LOOKBACK_DAYS: i64 = 14;

/// Finnhub news article, reduced to what sentiment scoring reads
#[derive(Debug, Clone, Deserialize)]
pub struct FinnhubNewsArticle {
    /// Publish time (UNIX timestamp)
    #[serde(default)]
    pub datetime: i64,
    /// News headline
    #[serde(default)]
    pub headline: String,
    /// Publisher
    #[serde(default)]
    pub source: String,
}

/// Rate-limited Finnhub client
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    /// Create a client allowing `rate_limit` requests per minute
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        let per_minute = NonZeroU32::new(rate_limit).ok_or_else(|| {
            MarketError::ConfigError("Finnhub rate limit must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            rate_limiter,
        })
    }

    /// Company news for `symbol` between two `YYYY-MM-DD` dates, newest first
    pub async fn get_company_news(
        &self,
        symbol: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<FinnhubNewsArticle>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{FINNHUB_BASE}/company-news"))
            .query(&[
                ("symbol", symbol),
                ("from", from),
                ("to", to),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await?;

        match response.status().as_u16() {
            429 => {
                return Err(MarketError::ApiError(
                    "Finnhub rate limit exceeded".to_string(),
                ));
            }
            s if !(200..300).contains(&s) => {
                return Err(MarketError::ApiError(format!(
                    "Finnhub returned HTTP {s}"
                )));
            }
            _ => {}
        }

        let mut articles: Vec<FinnhubNewsArticle> = response.json().await?;
        articles.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        Ok(articles)
    }
}

#[async_trait]
impl NewsSource for FinnhubClient {
    fn source_name(&self) -> &str {
        "Finnhub"
    }

    async fn headlines(&self, symbol: &str, limit: usize) -> Result<Vec<Headline>> {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(LOOKBACK_DAYS);
        let articles = self
            .get_company_news(
                symbol,
                &from.format("%Y-%m-%d").to_string(),
                &to.format("%Y-%m-%d").to_string(),
            )
            .await?;

        Ok(articles
            .into_iter()
            .filter(|a| !a.headline.trim().is_empty())
            .take(limit)
            .map(|a| Headline {
                title: a.headline,
                source: self.source_name().to_string(),
            })
            .collect())
    }
}
