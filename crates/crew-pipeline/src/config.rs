//! Explicit configuration for an analysis run
//!
//! Credentials and endpoints are passed in through [`CrewConfig`]. The
//! environment is read only by [`CrewConfig::from_env`], once, at
//! construction time.

use crate::error::{PipelineError, Result};
use crew_llm::providers::openai::DEFAULT_API_BASE;
use crew_market::MarketConfig;
use std::fmt;
use std::time::Duration;

/// Text recorded for a stage whose narrative backend was unavailable
pub const DEFAULT_DEGRADED_MARKER: &str = "LLM unavailable";

/// API key variables, in order of precedence
pub const API_KEY_VARS: [&str; 3] = ["CREW_LLM_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"];

/// Narrative backend settings
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    /// LLM round trips allowed per stage, tool calls included
    pub max_tool_iterations: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
            max_tool_iterations: 10,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .finish()
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "no LLM API key configured (set one of {})",
                API_KEY_VARS.join(", ")
            )));
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::Config("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PipelineError::Config(format!(
                "temperature {} is outside [0, 2]",
                self.temperature
            )));
        }
        if self.max_tokens == 0 || self.max_tool_iterations == 0 {
            return Err(PipelineError::Config(
                "max_tokens and max_tool_iterations must be greater than 0".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(PipelineError::Config("timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Everything a [`Pipeline`](crate::Pipeline) needs to run
#[derive(Debug, Clone)]
pub struct CrewConfig {
    pub llm: LlmConfig,
    pub market: MarketConfig,
    pub degraded_marker: String,
}

impl CrewConfig {
    pub fn builder() -> CrewConfigBuilder {
        CrewConfigBuilder::default()
    }

    /// Build from environment variables.
    ///
    /// Reads the first non-empty of [`API_KEY_VARS`], plus `CREW_LLM_API_BASE`,
    /// `CREW_LLM_MODEL` and `FINNHUB_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(key) = API_KEY_VARS.iter().find_map(|name| var(name)) {
            builder = builder.api_key(key);
        }
        if let Some(base) = var("CREW_LLM_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Some(model) = var("CREW_LLM_MODEL") {
            builder = builder.model(model);
        }

        let mut market = MarketConfig::builder();
        if let Some(key) = var("FINNHUB_API_KEY") {
            market = market.finnhub_api_key(key);
        }
        builder.market(market.build()?).build()
    }

    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.market.validate()?;
        if self.degraded_marker.trim().is_empty() {
            return Err(PipelineError::Config(
                "degraded_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`CrewConfig`]
#[derive(Debug, Default)]
pub struct CrewConfigBuilder {
    llm: LlmConfig,
    market: Option<MarketConfig>,
    degraded_marker: Option<String>,
}

impl CrewConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.llm.api_key = key.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.llm.api_base = base.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.llm.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.llm.temperature = temperature;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.llm.timeout = timeout;
        self
    }

    pub fn max_tool_iterations(mut self, iterations: usize) -> Self {
        self.llm.max_tool_iterations = iterations;
        self
    }

    pub fn market(mut self, market: MarketConfig) -> Self {
        self.market = Some(market);
        self
    }

    pub fn degraded_marker(mut self, marker: impl Into<String>) -> Self {
        self.degraded_marker = Some(marker.into());
        self
    }

    pub fn build(self) -> Result<CrewConfig> {
        let config = CrewConfig {
            llm: self.llm,
            market: self.market.unwrap_or_default(),
            degraded_marker: self
                .degraded_marker
                .unwrap_or_else(|| DEFAULT_DEGRADED_MARKER.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = CrewConfig::builder().api_key("k").build().unwrap();
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.api_base, DEFAULT_API_BASE);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.timeout, Duration::from_secs(120));
        assert_eq!(config.llm.max_tool_iterations, 10);
        assert_eq!(config.degraded_marker, "LLM unavailable");
        assert_eq!(config.market.benchmark, "SPY");
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = CrewConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("CREW_LLM_API_KEY"));
    }

    #[test]
    fn invalid_temperature_is_rejected() {
        assert!(CrewConfig::builder().api_key("k").temperature(3.5).build().is_err());
    }

    #[test]
    fn api_key_precedence() {
        let config = CrewConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "openai"),
            ("GEMINI_API_KEY", "gemini"),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_key, "gemini");

        let config = CrewConfig::from_lookup(lookup(&[
            ("CREW_LLM_API_KEY", "crew"),
            ("GEMINI_API_KEY", "gemini"),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_key, "crew");
    }

    #[test]
    fn empty_variables_are_ignored() {
        let config = CrewConfig::from_lookup(lookup(&[
            ("CREW_LLM_API_KEY", "  "),
            ("OPENAI_API_KEY", "openai"),
            ("CREW_LLM_MODEL", ""),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_key, "openai");
        assert_eq!(config.llm.model, "gemini-2.0-flash");
    }

    #[test]
    fn endpoint_model_and_finnhub_from_environment() {
        let config = CrewConfig::from_lookup(lookup(&[
            ("CREW_LLM_API_KEY", "k"),
            ("CREW_LLM_API_BASE", "http://localhost:1234/v1"),
            ("CREW_LLM_MODEL", "qwen2.5"),
            ("FINNHUB_API_KEY", "fh"),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_base, "http://localhost:1234/v1");
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.market.finnhub_api_key.as_deref(), Some("fh"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = CrewConfig::builder().api_key("secret-key").build().unwrap();
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
