//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! This module provides the MCP server implementation using the pmcp crate
//! for proper JSON-RPC handling over stdio and streamable HTTP.

use crate::api::SpendingApi;
use crate::config::ToolDefaults;
use crate::mcp::tools::ToolRegistry;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Name the server reports to MCP clients
pub const SERVER_NAME: &str = "usaspending-mcp";

/// The USAspending MCP server
///
/// Exposes the spending tools over stdio or streamable HTTP. The API client
/// is injected by the caller and lives as long as the server.
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
}

impl McpServer {
    /// Create a new MCP server whose tools call `api`
    pub fn new(api: Arc<dyn SpendingApi>, defaults: ToolDefaults) -> Result<Self, pmcp::Error> {
        Self::from_registry(ToolRegistry::new(api, defaults))
    }

    /// Create a server exposing every tool in `tools`
    pub fn from_registry(tools: ToolRegistry) -> Result<Self, pmcp::Error> {
        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
        })
    }

    /// Build the MCP server with tool handlers (internal implementation)
    fn build_server_impl(tools: ToolRegistry) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name(SERVER_NAME)
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode
    pub async fn run(self) -> Result<(), pmcp::Error> {
        info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server in streamable HTTP mode on `addr`
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());
        http_server.start().await
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        debug!(tool = %self.name, "Tool call");
        self.handler.execute(args).await.map_err(Error::from)
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;

    fn server() -> McpServer {
        McpServer::new(Arc::new(MockApi::new()), ToolDefaults::default()).unwrap()
    }

    #[test]
    fn test_server_builds_with_both_tools() {
        let registry = ToolRegistry::new(Arc::new(MockApi::new()), ToolDefaults::default());
        assert_eq!(registry.all().len(), 2);
        assert!(McpServer::from_registry(registry).is_ok());
    }

    #[tokio::test]
    async fn test_run_http_rejects_bad_address() {
        assert!(server().run_http("not-an-address").await.is_err());
    }

    #[tokio::test]
    async fn test_run_consumes_only_unique_server() {
        let server = server();
        let _other = server.clone();
        assert!(server.run().await.is_err());
    }
}
