//! Core abstractions shared by the stock analysis crew.
//!
//! This crate provides:
//! - The [`Tool`] trait implemented by every quantitative tool
//! - [`ToolRegistry`], an ordered registry that can be narrowed to a stage's allow-list
//! - The crate-level [`Error`] type
//! - Tracing initialisation used by the binaries

pub mod error;
pub mod logging;
pub mod registry;
pub mod schema;
pub mod tool;

pub use error::{Error, Result};
pub use registry::ToolRegistry;
pub use tool::Tool;
