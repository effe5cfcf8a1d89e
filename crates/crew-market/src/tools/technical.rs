//! Technical analysis over two years of daily prices

use crate::api::{Bar, MarketData};
use crate::error::{MarketError, Result};
use crate::outcome::{FailureShape, ToolFailure, ToolOutcome, finite};
use crate::tools::patterns::{find_peaks, find_troughs, identify_chart_patterns, peak_distance};
use crate::tools::{TickerParams, tool_names};
use async_trait::async_trait;
use crew_core::{Result as CoreResult, Tool, schema};
use serde::Serialize;
use serde_json::{Value, json};
use statrs::statistics::Statistics;
use std::sync::Arc;
use ta::Next;
use ta::indicators::{
    AverageTrueRange, BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
};
use tracing::{info, warn};

/// Fewer bars than this and no indicator is meaningful
pub const MIN_DATA_POINTS: usize = 30;
const TRADING_DAYS: f64 = 252.0;

impl ta::Open for Bar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

/// Indicator snapshot at the latest bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalReport {
    pub ticker: String,
    pub current_price: f64,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub rsi: Option<f64>,
    /// MACD histogram (MACD line minus signal line)
    pub macd: Option<f64>,
    /// 1.0 when the close is at or above the upper Bollinger band
    pub bollinger_hband: Option<f64>,
    /// 1.0 when the close is at or below the lower Bollinger band
    pub bollinger_lband: Option<f64>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,
    pub momentum: Option<f64>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub identified_patterns: Vec<String>,
    pub data_points: usize,
}

/// Compute every indicator from daily bars, oldest first
pub fn analyze(ticker: &str, bars: &[Bar]) -> Result<TechnicalReport> {
    if bars.len() < MIN_DATA_POINTS {
        return Err(MarketError::InsufficientData {
            symbol: ticker.to_string(),
            points: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let current_price = closes[closes.len() - 1];

    let mut rsi = RelativeStrengthIndex::new(14)?;
    let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9)?;
    let mut bands = BollingerBands::new(20, 2.0)?;
    let mut atr = AverageTrueRange::new(14)?;

    let mut last_rsi = f64::NAN;
    let mut last_histogram = f64::NAN;
    let mut last_atr = f64::NAN;
    let mut last_bands = None;
    for bar in bars {
        last_rsi = rsi.next(bar.close);
        last_histogram = macd.next(bar.close).histogram;
        last_bands = Some(bands.next(bar.close));
        last_atr = atr.next(bar);
    }

    let (bollinger_hband, bollinger_lband) = match last_bands {
        Some(b) => (
            Some(if current_price >= b.upper { 1.0 } else { 0.0 }),
            Some(if current_price <= b.lower { 1.0 } else { 0.0 }),
        ),
        None => (None, None),
    };

    let window = adaptive_window(closes.len());
    let distance = peak_distance(closes.len());
    let support_levels = last_levels(&closes, &find_troughs(&closes, distance));
    let resistance_levels = last_levels(&closes, &find_peaks(&closes, distance));

    Ok(TechnicalReport {
        ticker: ticker.to_string(),
        current_price,
        sma_50: simple_moving_average(&closes, 50),
        sma_200: simple_moving_average(&closes, 200),
        rsi: finite(last_rsi),
        macd: finite(last_histogram),
        bollinger_hband,
        bollinger_lband,
        atr: finite(last_atr),
        volatility: Some(rolling_volatility(&closes, window)),
        momentum: Some(current_price - closes[closes.len() - 1 - window]),
        support_levels,
        resistance_levels,
        identified_patterns: identify_chart_patterns(&closes),
        data_points: closes.len(),
    })
}

/// Between 5 and 20 bars, a tenth of the series in between
fn adaptive_window(len: usize) -> usize {
    (len / 10).clamp(5, 20)
}

fn simple_moving_average(closes: &[f64], period: usize) -> Option<f64> {
    (closes.len() >= period).then(|| closes[closes.len() - period..].mean())
}

/// Annualised sample deviation of the last `window` daily returns, 0.0 when undefined
fn rolling_volatility(closes: &[f64], window: usize) -> f64 {
    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    if returns.len() < window {
        return 0.0;
    }
    let std = returns[returns.len() - window..].std_dev();
    if std.is_finite() {
        std * TRADING_DAYS.sqrt()
    } else {
        0.0
    }
}

/// Closing prices at the last three extrema
fn last_levels(closes: &[f64], extrema: &[usize]) -> Vec<f64> {
    extrema
        .iter()
        .skip(extrema.len().saturating_sub(3))
        .map(|&i| closes[i])
        .collect()
}

/// Tool computing trend, momentum and volatility indicators
pub struct TechnicalAnalysisTool {
    data: Arc<dyn MarketData>,
    range: String,
}

impl TechnicalAnalysisTool {
    /// `range` is the history window, normally "2y"
    pub fn new(data: Arc<dyn MarketData>, range: impl Into<String>) -> Self {
        Self {
            data,
            range: range.into(),
        }
    }

    /// Fetch history and analyze it, mapping every failure to a payload
    pub async fn run(&self, ticker: &str) -> ToolOutcome<TechnicalReport> {
        let result = match self.data.price_history(ticker, &self.range).await {
            Ok(bars) => analyze(ticker, &bars),
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                info!(ticker, data_points = report.data_points, "Technical analysis completed");
                ToolOutcome::Success(report)
            }
            Err(e @ MarketError::InsufficientData { .. }) => {
                warn!(ticker, error = %e, "Technical analysis skipped");
                ToolOutcome::Failure(ToolFailure::new(ticker, e.to_string(), FailureShape::Plain))
            }
            Err(e) => {
                warn!(ticker, error = %e, "Technical analysis failed");
                ToolOutcome::Failure(ToolFailure::new(
                    ticker,
                    format!("Error analyzing {ticker}: {e}"),
                    FailureShape::Plain,
                ))
            }
        }
    }
}

#[async_trait]
impl Tool for TechnicalAnalysisTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: TickerParams = serde_json::from_value(params)?;
        let ticker = params.normalized_ticker();
        Ok(self.run(&ticker).await.into_value(&ticker, FailureShape::Plain))
    }

    fn name(&self) -> &str {
        tool_names::TECHNICAL
    }

    fn description(&self) -> &str {
        "Technical analysis of a stock from two years of daily prices: SMA-50/200, RSI, MACD \
         histogram, Bollinger band touches, ATR, volatility, momentum, support and resistance \
         levels and chart patterns."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "ticker": schema::string("Stock ticker symbol, e.g. AAPL") }),
            &["ticker"],
        )
    }
}
