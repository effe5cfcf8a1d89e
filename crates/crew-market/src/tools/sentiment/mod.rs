//! Headline sentiment across news sources

pub mod lexicon;

use crate::api::{Headline, NewsSource};
use crate::outcome::{FailureShape, ToolOutcome};
use crate::tools::{TickerParams, tool_names};
use async_trait::async_trait;
use crew_core::{Result as CoreResult, Tool, schema};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Polarity above this counts a headline as positive
const POSITIVE_THRESHOLD: f64 = 0.2;
/// Polarity below this counts a headline as negative
const NEGATIVE_THRESHOLD: f64 = -0.2;

/// Aggregate sentiment over all fetched headlines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub average_sentiment: f64,
    pub positive_articles: usize,
    pub neutral_articles: usize,
    pub negative_articles: usize,
    pub total_articles: usize,
    pub sources: Vec<String>,
    pub sentiment_interpretation: String,
}

/// Verbal label for an average polarity
pub fn interpret(average: f64) -> &'static str {
    if average > 0.3 {
        "Strongly Positive"
    } else if average > 0.1 {
        "Positive"
    } else if average < -0.3 {
        "Strongly Negative"
    } else if average < -0.1 {
        "Negative"
    } else {
        "Neutral"
    }
}

/// Score and count `headlines`; `sources` is reported as given
pub fn summarize(headlines: &[Headline], sources: Vec<String>) -> SentimentReport {
    if headlines.is_empty() {
        return SentimentReport {
            average_sentiment: 0.0,
            positive_articles: 0,
            neutral_articles: 0,
            negative_articles: 0,
            total_articles: 0,
            sources,
            sentiment_interpretation: "No Data".to_string(),
        };
    }

    let scores: Vec<f64> = headlines.iter().map(|h| lexicon::polarity(&h.title)).collect();
    let positive = scores.iter().filter(|&&s| s > POSITIVE_THRESHOLD).count();
    let negative = scores.iter().filter(|&&s| s < NEGATIVE_THRESHOLD).count();
    let average = scores.iter().sum::<f64>() / scores.len() as f64;

    SentimentReport {
        average_sentiment: (average * 1000.0).round() / 1000.0,
        positive_articles: positive,
        neutral_articles: scores.len() - positive - negative,
        negative_articles: negative,
        total_articles: scores.len(),
        sources,
        sentiment_interpretation: interpret(average).to_string(),
    }
}

/// Tool scoring recent headlines about a ticker
pub struct SentimentAnalysisTool {
    sources: Vec<Arc<dyn NewsSource>>,
    per_source_limit: usize,
}

impl SentimentAnalysisTool {
    pub fn new(sources: Vec<Arc<dyn NewsSource>>, per_source_limit: usize) -> Self {
        Self {
            sources,
            per_source_limit,
        }
    }

    /// Never fails: an unavailable source contributes no headlines
    pub async fn run(&self, ticker: &str) -> ToolOutcome<SentimentReport> {
        let mut headlines = Vec::new();
        for source in &self.sources {
            match source.headlines(ticker, self.per_source_limit).await {
                Ok(found) => {
                    debug!(ticker, source = source.source_name(), count = found.len(), "Fetched headlines");
                    headlines.extend(found.into_iter().take(self.per_source_limit));
                }
                Err(e) => {
                    warn!(ticker, source = source.source_name(), error = %e, "News source unavailable");
                }
            }
        }

        let names = self
            .sources
            .iter()
            .map(|s| s.source_name().to_string())
            .collect();
        let report = summarize(&headlines, names);
        info!(
            ticker,
            total = report.total_articles,
            average = report.average_sentiment,
            "Sentiment analysis completed"
        );
        ToolOutcome::Success(report)
    }
}

#[async_trait]
impl Tool for SentimentAnalysisTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: TickerParams = serde_json::from_value(params)?;
        let ticker = params.normalized_ticker();
        Ok(self
            .run(&ticker)
            .await
            .into_value(&ticker, FailureShape::Plain))
    }

    fn name(&self) -> &str {
        tool_names::SENTIMENT
    }

    fn description(&self) -> &str {
        "Sentiment of recent news headlines about a stock. Returns the average polarity \
         (-1 to 1), counts of positive, neutral and negative articles, the news sources \
         consulted and a verbal interpretation."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "ticker": schema::string("Stock ticker symbol, e.g. AAPL") }),
            &["ticker"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MarketError, Result};

    struct FixedSource {
        name: &'static str,
        titles: Vec<&'static str>,
    }

    #[async_trait]
    impl NewsSource for FixedSource {
        fn source_name(&self) -> &str {
            self.name
        }

        async fn headlines(&self, _symbol: &str, limit: usize) -> Result<Vec<Headline>> {
            Ok(self
                .titles
                .iter()
                .take(limit)
                .map(|t| Headline {
                    title: (*t).to_string(),
                    source: self.name.to_string(),
                })
                .collect())
        }
    }

    struct DownSource;

    #[async_trait]
    impl NewsSource for DownSource {
        fn source_name(&self) -> &str {
            "Down"
        }

        async fn headlines(&self, _symbol: &str, _limit: usize) -> Result<Vec<Headline>> {
            Err(MarketError::ApiError("HTTP 503".to_string()))
        }
    }

    #[test]
    fn interpretation_steps() {
        assert_eq!(interpret(0.35), "Strongly Positive");
        assert_eq!(interpret(0.15), "Positive");
        assert_eq!(interpret(0.0), "Neutral");
        assert_eq!(interpret(-0.15), "Negative");
        assert_eq!(interpret(-0.35), "Strongly Negative");
        assert_eq!(interpret(0.1), "Neutral");
    }

    #[test]
    fn no_headlines_is_no_data() {
        let report = summarize(&[], vec!["Yahoo Finance".to_string()]);
        assert_eq!(report.total_articles, 0);
        assert_eq!(report.average_sentiment, 0.0);
        assert_eq!(report.sentiment_interpretation, "No Data");
    }

    #[tokio::test]
    async fn counts_and_average_over_sources() {
        let tool = SentimentAnalysisTool::new(
            vec![
                Arc::new(FixedSource {
                    name: "Yahoo Finance",
                    titles: vec!["Shares surge after record profit", "Company schedules meeting"],
                }),
                Arc::new(FixedSource {
                    name: "Finnhub",
                    titles: vec!["Stock plunges on fraud lawsuit"],
                }),
            ],
            30,
        );

        let out = tool.execute(json!({ "ticker": "acme" })).await.unwrap();
        assert_eq!(out["total_articles"], 3);
        assert_eq!(out["positive_articles"], 1);
        assert_eq!(out["neutral_articles"], 1);
        assert_eq!(out["negative_articles"], 1);
        assert_eq!(out["sources"], json!(["Yahoo Finance", "Finnhub"]));
    }

    #[tokio::test]
    async fn failing_source_contributes_nothing() {
        let tool = SentimentAnalysisTool::new(
            vec![
                Arc::new(DownSource),
                Arc::new(FixedSource {
                    name: "Yahoo Finance",
                    titles: vec!["Analysts upgrade outlook"],
                }),
            ],
            30,
        );

        let ToolOutcome::Success(report) = tool.run("ACME").await else {
            panic!("sentiment never fails");
        };
        assert_eq!(report.total_articles, 1);
    }

    #[tokio::test]
    async fn limit_applies_per_source() {
        let tool = SentimentAnalysisTool::new(
            vec![Arc::new(FixedSource {
                name: "Yahoo Finance",
                titles: vec!["gain"; 10],
            })],
            4,
        );

        let ToolOutcome::Success(report) = tool.run("ACME").await else {
            panic!("sentiment never fails");
        };
        assert_eq!(report.total_articles, 4);
        assert_eq!(report.sentiment_interpretation, "Strongly Positive");
    }
}
