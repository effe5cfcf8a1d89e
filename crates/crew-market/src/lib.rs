//! Market data access and the quantitative tools offered to analyst stages.
//!
//! The [`api`] module defines the [`MarketData`](api::MarketData) provider
//! boundary and its Yahoo Finance and Finnhub implementations. The [`tools`]
//! module turns raw market data into structured metrics; every tool reports
//! data problems as an error payload instead of failing the call.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod outcome;
pub mod tools;

pub use api::{Bar, CompanyProfile, Headline, MarketData, NewsSource};
pub use cache::CachedMarketData;
pub use config::MarketConfig;
pub use error::{MarketError, Result};
pub use outcome::{FailureShape, ToolFailure, ToolOutcome};
pub use tools::{MarketToolkit, tool_names};
