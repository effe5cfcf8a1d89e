//! Risk assessment against a benchmark index
//!
//! Daily returns of the stock and the benchmark are aligned on common
//! trading dates. Ratios that are undefined for the sample (zero variance,
//! no losing days, a zero drawdown) serialize as `null`.

use crate::api::{Bar, MarketData};
use crate::error::{MarketError, Result};
use crate::outcome::{FailureShape, ToolFailure, ToolOutcome, finite};
use crate::tools::tool_names;
use async_trait::async_trait;
use crew_core::{Result as CoreResult, Tool, schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const TRADING_DAYS: f64 = 252.0;
/// Fewer aligned returns than this cannot support a regression
const MIN_RETURNS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub ticker: String,
    pub time_period: String,
    pub benchmark: String,

    pub volatility: Option<f64>,
    pub beta: Option<f64>,
    pub alpha: Option<f64>,
    pub r_squared: Option<f64>,

    pub value_at_risk_95: Option<f64>,
    pub value_at_risk_99: Option<f64>,
    pub conditional_var_95: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub downside_deviation: Option<f64>,
    pub ulcer_index: Option<f64>,

    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub treynor_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,
    pub information_ratio: Option<f64>,
    pub omega_ratio: Option<f64>,

    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub tail_ratio: Option<f64>,

    /// Share of variance the stock contributes to a 50/50 stock/benchmark portfolio
    pub risk_contribution: Option<f64>,
    pub risk_category: String,
}

/// Qualitative risk band from beta, annualised volatility and max drawdown.
///
/// Each metric scores 1 (low), 2 (medium) or 3 (high); a total of at most 4
/// is low risk, at most 7 medium. Undefined inputs score high.
pub fn categorize_risk(beta: f64, volatility: f64, max_drawdown: f64) -> &'static str {
    fn band(value: f64, low: f64, high: f64) -> u8 {
        if value < low {
            1
        } else if value <= high {
            2
        } else {
            3
        }
    }

    let score = band(beta, 0.8, 1.2) + band(volatility, 0.15, 0.25) + band(max_drawdown.abs(), 0.15, 0.3);
    match score {
        0..=4 => "Low Risk",
        5..=7 => "Medium Risk",
        _ => "High Risk",
    }
}

/// Simple returns of closes on the dates both series share
fn aligned_returns(stock: &[Bar], benchmark: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let bench_close: HashMap<_, _> = benchmark.iter().map(|b| (b.date, b.close)).collect();
    let pairs: Vec<(f64, f64)> = stock
        .iter()
        .filter_map(|b| bench_close.get(&b.date).map(|&c| (b.close, c)))
        .collect();

    pairs
        .windows(2)
        .map(|w| (w[1].0 / w[0].0 - 1.0, w[1].1 / w[0].1 - 1.0))
        .unzip()
}

/// Linear-interpolated percentile, `q` in [0, 100]
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Population central moment of order `k`
fn central_moment(values: &[f64], mean: f64, k: i32) -> f64 {
    values.iter().map(|v| (v - mean).powi(k)).sum::<f64>() / values.len() as f64
}

/// Slope, intercept and correlation of the least-squares fit of `y` on `x`
fn linear_regression(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let (mx, my) = (x.mean(), y.mean());
    let n = x.len() as f64;
    let sxy = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum::<f64>() / n;
    let sxx = central_moment(x, mx, 2);
    let syy = central_moment(y, my, 2);
    let slope = sxy / sxx;
    (slope, my - slope * mx, sxy / (sxx * syy).sqrt())
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        finite(numerator / denominator)
    }
}

/// Compute the full report from aligned daily returns
pub fn assess(
    ticker: &str,
    benchmark: &str,
    period: &str,
    risk_free_rate: f64,
    stock_returns: &[f64],
    benchmark_returns: &[f64],
) -> Result<RiskReport> {
    if stock_returns.len() < MIN_RETURNS {
        return Err(MarketError::InsufficientData {
            symbol: ticker.to_string(),
            points: stock_returns.len(),
        });
    }

    let r = stock_returns;
    let b = benchmark_returns;
    let n = r.len() as f64;
    let annual = TRADING_DAYS.sqrt();
    let daily_rf = (1.0 + risk_free_rate).powf(1.0 / TRADING_DAYS) - 1.0;

    let (beta, intercept, corr) = linear_regression(b, r);
    let alpha = intercept * TRADING_DAYS;
    let r_squared = corr * corr;

    let mean = r.mean();
    let volatility = r.std_dev() * annual;

    let excess: Vec<f64> = r.iter().map(|x| x - daily_rf).collect();
    let excess_mean = excess.as_slice().mean();
    let sharpe = annual * excess_mean / excess.as_slice().std_dev();

    let negative_excess: Vec<f64> = excess.iter().copied().filter(|&x| x < 0.0).collect();
    let sortino = if negative_excess.is_empty() {
        None
    } else {
        finite(annual * excess_mean / negative_excess.as_slice().std_dev())
    };

    let treynor = ratio((mean - daily_rf) * TRADING_DAYS, beta);

    let var_95 = percentile(r, 5.0);
    let var_99 = percentile(r, 1.0);
    let tail: Vec<f64> = r.iter().copied().filter(|&x| x <= var_95).collect();
    let cvar_95 = tail.as_slice().mean();

    let mut wealth = 1.0;
    let mut peak = f64::MIN;
    let drawdowns: Vec<f64> = r
        .iter()
        .map(|x| {
            wealth *= 1.0 + x;
            peak = peak.max(wealth);
            (wealth - peak) / peak
        })
        .collect();
    let max_drawdown = drawdowns.iter().copied().fold(0.0, f64::min);
    let ulcer = (drawdowns.iter().map(|d| d * d).sum::<f64>() / n).sqrt();

    let downside_sq: f64 = r
        .iter()
        .filter(|&&x| x < daily_rf)
        .map(|x| (daily_rf - x).powi(2))
        .sum();
    let downside_deviation = (downside_sq / n).sqrt() * annual;

    let calmar = ratio(mean * TRADING_DAYS, max_drawdown.abs());

    let m2 = central_moment(r, mean, 2);
    let skewness = central_moment(r, mean, 3) / m2.powf(1.5);
    let kurtosis = central_moment(r, mean, 4) / (m2 * m2) - 3.0;

    let active: Vec<f64> = r.iter().zip(b).map(|(x, y)| x - y).collect();
    let tracking_error = active.as_slice().std_dev() * annual;
    let information = ratio((mean - b.mean()) * TRADING_DAYS, tracking_error);

    let gains: f64 = r.iter().filter(|&&x| x > daily_rf).sum();
    let losses: f64 = r.iter().filter(|&&x| x < daily_rf).sum();
    let omega = ratio(gains, losses.abs());

    let tail_ratio = ratio(percentile(r, 95.0).abs(), var_95.abs());

    let bench_std = b.std_dev();
    let cross = beta * volatility * bench_std * TRADING_DAYS;
    let portfolio_variance =
        0.25 * volatility.powi(2) + 0.25 * bench_std.powi(2) * TRADING_DAYS + 0.5 * cross;
    let risk_contribution = ratio(0.5 * volatility.powi(2) + 0.5 * cross, portfolio_variance);

    Ok(RiskReport {
        ticker: ticker.to_string(),
        time_period: period.to_string(),
        benchmark: benchmark.to_string(),
        volatility: finite(volatility),
        beta: finite(beta),
        alpha: finite(alpha),
        r_squared: finite(r_squared),
        value_at_risk_95: finite(var_95),
        value_at_risk_99: finite(var_99),
        conditional_var_95: finite(cvar_95),
        max_drawdown: finite(max_drawdown),
        downside_deviation: finite(downside_deviation),
        ulcer_index: finite(ulcer),
        sharpe_ratio: finite(sharpe),
        sortino_ratio: sortino,
        treynor_ratio: treynor,
        calmar_ratio: calmar,
        information_ratio: information,
        omega_ratio: omega,
        skewness: finite(skewness),
        kurtosis: finite(kurtosis),
        tail_ratio,
        risk_contribution,
        risk_category: categorize_risk(beta, volatility, max_drawdown).to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct RiskParams {
    ticker: String,
    benchmark: Option<String>,
    period: Option<String>,
    risk_free_rate: Option<f64>,
}

/// Tool measuring volatility, drawdown and risk-adjusted return
pub struct RiskAssessmentTool {
    data: Arc<dyn MarketData>,
    benchmark: String,
    period: String,
    risk_free_rate: f64,
}

impl RiskAssessmentTool {
    /// Defaults used when a call leaves the optional parameters out
    pub fn new(
        data: Arc<dyn MarketData>,
        benchmark: impl Into<String>,
        period: impl Into<String>,
        risk_free_rate: f64,
    ) -> Self {
        Self {
            data,
            benchmark: benchmark.into(),
            period: period.into(),
            risk_free_rate,
        }
    }

    pub async fn run(
        &self,
        ticker: &str,
        benchmark: &str,
        period: &str,
        risk_free_rate: f64,
    ) -> ToolOutcome<RiskReport> {
        let result = async {
            let stock = self.data.price_history(ticker, period).await?;
            let bench = self.data.price_history(benchmark, period).await?;
            let (stock_returns, bench_returns) = aligned_returns(&stock, &bench);
            assess(ticker, benchmark, period, risk_free_rate, &stock_returns, &bench_returns)
        }
        .await;

        match result {
            Ok(report) => {
                info!(ticker, benchmark, category = %report.risk_category, "Risk assessment completed");
                ToolOutcome::Success(report)
            }
            Err(e) => {
                warn!(ticker, benchmark, error = %e, "Risk assessment failed");
                ToolOutcome::Failure(ToolFailure::new(ticker, e.to_string(), FailureShape::Failed))
            }
        }
    }
}

#[async_trait]
impl Tool for RiskAssessmentTool {
    async fn execute(&self, params: Value) -> CoreResult<Value> {
        let params: RiskParams = serde_json::from_value(params)?;
        let ticker = params.ticker.trim().to_uppercase();
        let benchmark = params
            .benchmark
            .map_or_else(|| self.benchmark.clone(), |b| b.trim().to_uppercase());
        let period = params.period.unwrap_or_else(|| self.period.clone());
        let rf = params.risk_free_rate.unwrap_or(self.risk_free_rate);

        Ok(self
            .run(&ticker, &benchmark, &period, rf)
            .await
            .into_value(&ticker, FailureShape::Failed))
    }

    fn name(&self) -> &str {
        tool_names::RISK
    }

    fn description(&self) -> &str {
        "Risk assessment of a stock against a benchmark index: volatility, beta, alpha, \
         R-squared, value at risk, conditional VaR, maximum drawdown, downside deviation, \
         ulcer index, Sharpe, Sortino, Treynor, Calmar, information and omega ratios, \
         skewness, kurtosis, tail ratio, portfolio risk contribution and a risk category."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "ticker": schema::string("Stock ticker symbol, e.g. AAPL"),
                "benchmark": schema::string("Benchmark symbol (default SPY)"),
                "period": schema::string("History period such as 1y, 2y or 5y (default 5y)"),
                "risk_free_rate": schema::number("Annual risk-free rate (default 0.02)"),
            }),
            &["ticker"],
        )
    }
}
