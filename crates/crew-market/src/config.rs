//! Configuration for market data access and the quantitative tools

use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ranges accepted by the history endpoints
pub const SUPPORTED_RANGES: &[&str] = &["1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"];

/// Configuration for market data and tool defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Benchmark used by the risk assessment
    pub benchmark: String,

    /// History range for the risk assessment
    pub risk_period: String,

    /// Annual risk-free rate for the risk assessment
    pub risk_free_rate: f64,

    /// History range for the technical analysis
    pub technical_range: String,

    /// Default number of peers for the competitor analysis
    pub num_competitors: usize,

    /// Headlines taken from each news source
    pub max_articles_per_source: usize,

    /// Finnhub API key; the Finnhub news source is skipped without it
    pub finnhub_api_key: Option<String>,

    /// Finnhub requests per minute (free tier: 60)
    pub finnhub_rate_limit: u32,

    /// Lifetime of cached market data; `None` disables caching
    pub cache_ttl: Option<Duration>,

    /// Request timeout for HTTP calls
    pub request_timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            benchmark: "SPY".to_string(),
            risk_period: "5y".to_string(),
            risk_free_rate: 0.02,
            technical_range: "2y".to_string(),
            num_competitors: 5,
            max_articles_per_source: 30,
            finnhub_api_key: None,
            finnhub_rate_limit: 60,
            cache_ttl: Some(Duration::from_secs(300)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl MarketConfig {
    /// Create a new configuration builder
    pub fn builder() -> MarketConfigBuilder {
        MarketConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, range) in [
            ("risk_period", &self.risk_period),
            ("technical_range", &self.technical_range),
        ] {
            if !SUPPORTED_RANGES.contains(&range.as_str()) {
                return Err(MarketError::ConfigError(format!(
                    "{name} '{range}' is not one of {SUPPORTED_RANGES:?}"
                )));
            }
        }

        if self.benchmark.trim().is_empty() {
            return Err(MarketError::ConfigError(
                "benchmark must not be empty".to_string(),
            ));
        }

        if !(-1.0..1.0).contains(&self.risk_free_rate) {
            return Err(MarketError::ConfigError(format!(
                "risk_free_rate {} is outside (-1, 1)",
                self.risk_free_rate
            )));
        }

        if self.num_competitors == 0 || self.max_articles_per_source == 0 {
            return Err(MarketError::ConfigError(
                "num_competitors and max_articles_per_source must be greater than 0".to_string(),
            ));
        }

        if self.finnhub_rate_limit == 0 {
            return Err(MarketError::ConfigError(
                "finnhub_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for MarketConfig
#[derive(Debug, Default)]
pub struct MarketConfigBuilder {
    benchmark: Option<String>,
    risk_period: Option<String>,
    risk_free_rate: Option<f64>,
    technical_range: Option<String>,
    num_competitors: Option<usize>,
    max_articles_per_source: Option<usize>,
    finnhub_api_key: Option<String>,
    finnhub_rate_limit: Option<u32>,
    cache_ttl: Option<Option<Duration>>,
    request_timeout: Option<Duration>,
}

impl MarketConfigBuilder {
    pub fn benchmark(mut self, symbol: impl Into<String>) -> Self {
        self.benchmark = Some(symbol.into());
        self
    }

    pub fn risk_period(mut self, range: impl Into<String>) -> Self {
        self.risk_period = Some(range.into());
        self
    }

    pub fn risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    pub fn technical_range(mut self, range: impl Into<String>) -> Self {
        self.technical_range = Some(range.into());
        self
    }

    pub fn num_competitors(mut self, n: usize) -> Self {
        self.num_competitors = Some(n);
        self
    }

    pub fn max_articles_per_source(mut self, n: usize) -> Self {
        self.max_articles_per_source = Some(n);
        self
    }

    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    pub fn finnhub_rate_limit(mut self, per_minute: u32) -> Self {
        self.finnhub_rate_limit = Some(per_minute);
        self
    }

    /// Set the cache lifetime; `None` turns caching off
    pub fn cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Load the Finnhub API key from `FINNHUB_API_KEY` when not already set
    pub fn with_env_api_key(mut self) -> Self {
        if self.finnhub_api_key.is_none() {
            self.finnhub_api_key = std::env::var("FINNHUB_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MarketConfig> {
        let defaults = MarketConfig::default();

        let config = MarketConfig {
            benchmark: self.benchmark.unwrap_or(defaults.benchmark),
            risk_period: self.risk_period.unwrap_or(defaults.risk_period),
            risk_free_rate: self.risk_free_rate.unwrap_or(defaults.risk_free_rate),
            technical_range: self.technical_range.unwrap_or(defaults.technical_range),
            num_competitors: self.num_competitors.unwrap_or(defaults.num_competitors),
            max_articles_per_source: self
                .max_articles_per_source
                .unwrap_or(defaults.max_articles_per_source),
            finnhub_api_key: self.finnhub_api_key,
            finnhub_rate_limit: self.finnhub_rate_limit.unwrap_or(defaults.finnhub_rate_limit),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.benchmark, "SPY");
        assert_eq!(config.risk_period, "5y");
        assert!((config.risk_free_rate - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.num_competitors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = MarketConfig::builder()
            .benchmark("QQQ")
            .risk_period("2y")
            .num_competitors(3)
            .cache_ttl(None)
            .build()
            .unwrap();

        assert_eq!(config.benchmark, "QQQ");
        assert_eq!(config.risk_period, "2y");
        assert_eq!(config.num_competitors, 3);
        assert!(config.cache_ttl.is_none());
    }

    #[test]
    fn test_rejects_unknown_range() {
        let result = MarketConfig::builder().technical_range("7w").build();
        assert!(matches!(result, Err(MarketError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_zero_competitors() {
        let config = MarketConfig {
            num_competitors: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
