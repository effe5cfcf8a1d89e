//! Quantitative tools offered to the analyst stages
//!
//! Each tool implements [`crew_core::Tool`] and reports data problems as an
//! error payload in its own wire layout rather than failing the call.

pub mod competitor;
pub mod fundamental;
pub mod patterns;
pub mod risk;
pub mod sentiment;
pub mod technical;

pub use competitor::CompetitorAnalysisTool;
pub use fundamental::FundamentalAnalysisTool;
pub use risk::{RiskAssessmentTool, categorize_risk};
pub use sentiment::SentimentAnalysisTool;
pub use technical::TechnicalAnalysisTool;

use crate::api::{FinnhubClient, MarketData, NewsSource, YahooFinanceClient};
use crate::cache::CachedMarketData;
use crate::config::MarketConfig;
use crate::error::Result;
use crew_core::ToolRegistry;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Registered tool names, as stage allow-lists refer to them
pub mod tool_names {
    pub const TECHNICAL: &str = "technical_analysis";
    pub const FUNDAMENTAL: &str = "fundamental_analysis";
    pub const SENTIMENT: &str = "sentiment_analysis";
    pub const RISK: &str = "risk_assessment";
    pub const COMPETITOR: &str = "competitor_analysis";
}

/// Input of the tools that take only a ticker
#[derive(Debug, Deserialize)]
pub(crate) struct TickerParams {
    ticker: String,
}

impl TickerParams {
    pub(crate) fn normalized_ticker(&self) -> String {
        self.ticker.trim().to_uppercase()
    }
}

/// The data sources every tool draws on
#[derive(Clone)]
pub struct MarketToolkit {
    data: Arc<dyn MarketData>,
    news: Vec<Arc<dyn NewsSource>>,
    config: Arc<MarketConfig>,
}

impl MarketToolkit {
    pub fn new(
        data: Arc<dyn MarketData>,
        news: Vec<Arc<dyn NewsSource>>,
        config: MarketConfig,
    ) -> Self {
        Self {
            data,
            news,
            config: Arc::new(config),
        }
    }

    /// Yahoo Finance for prices, profiles and news, plus Finnhub news when a key is set
    pub fn from_config(config: MarketConfig) -> Result<Self> {
        config.validate()?;

        let yahoo = YahooFinanceClient::new(config.request_timeout)?;
        let data: Arc<dyn MarketData> = match config.cache_ttl {
            Some(ttl) => Arc::new(CachedMarketData::new(yahoo, ttl)),
            None => Arc::new(yahoo),
        };

        let mut news: Vec<Arc<dyn NewsSource>> =
            vec![Arc::new(YahooFinanceClient::new(config.request_timeout)?)];
        if let Some(key) = &config.finnhub_api_key {
            news.push(Arc::new(FinnhubClient::new(
                key.clone(),
                config.finnhub_rate_limit,
                config.request_timeout,
            )?));
        }

        info!(
            news_sources = news.len(),
            cached = config.cache_ttl.is_some(),
            "Market toolkit ready"
        );
        Ok(Self::new(data, news, config))
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// All five tools, configured from the toolkit's defaults
    pub fn registry(&self) -> ToolRegistry {
        let c = &self.config;
        ToolRegistry::new()
            .with_tool(Arc::new(TechnicalAnalysisTool::new(
                self.data.clone(),
                c.technical_range.clone(),
            )))
            .with_tool(Arc::new(FundamentalAnalysisTool::new(self.data.clone())))
            .with_tool(Arc::new(CompetitorAnalysisTool::new(
                self.data.clone(),
                c.num_competitors,
            )))
            .with_tool(Arc::new(RiskAssessmentTool::new(
                self.data.clone(),
                c.benchmark.clone(),
                c.risk_period.clone(),
                c.risk_free_rate,
            )))
            .with_tool(Arc::new(SentimentAnalysisTool::new(
                self.news.clone(),
                c.max_articles_per_source,
            )))
    }
}
