//! MCP (Model Context Protocol) implementation.

mod handlers;
pub mod server;
mod tools;

pub use handlers::{GetAwardDetailsHandler, SearchSpendingByAwardHandler};
pub use server::McpServer;
pub use tools::{
    Tool, ToolError, ToolHandler, ToolRegistry, GET_AWARD_DETAILS, SEARCH_SPENDING_BY_AWARD,
};
