//! # USAspending MCP
//!
//! A Model Context Protocol (MCP) server exposing the USAspending.gov federal
//! spending API as agent tools.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Validated request models (award search filters, pagination, detail lookups)
//! - [`api`]: The [`SpendingApi`] client seam, its `reqwest` implementation and a mock
//! - [`fetch`]: Paginated award search and bounded concurrent award detail fetching
//! - [`mcp`]: MCP tool registry, handlers and server
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod fetch;
pub mod mcp;
pub mod models;

// Re-export commonly used types
pub use api::{ApiError, SpendingApi, UsaSpendingClient};
pub use models::{AwardSearchRequest, TimePeriod};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
