use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use usaspending_mcp::config::{find_config_file, load_config, Config, LoggingConfig};
use usaspending_mcp::mcp::{McpServer, ToolRegistry, GET_AWARD_DETAILS, SEARCH_SPENDING_BY_AWARD};
use usaspending_mcp::UsaSpendingClient;

/// USAspending MCP - Federal spending data from USAspending.gov as MCP tools
#[derive(Parser, Debug)]
#[command(name = "usaspending-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query USAspending.gov award data over MCP or from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default when no command is given)
    Serve {
        /// Run in stdio mode (for MCP clients like Claude Desktop; the default)
        #[arg(long, conflicts_with = "http")]
        stdio: bool,

        /// Run in streamable HTTP mode
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Search awards; prints the merged JSON result
    #[command(alias = "s")]
    Search {
        /// Award search request as JSON, or @path to a JSON file
        #[arg(long, short)]
        request: String,

        /// Maximum number of pages to fetch
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Fetch details for one or more awards
    Awards {
        /// Award IDs (at most 10)
        #[arg(required = true)]
        award_ids: Vec<String>,

        /// Maximum number of concurrent requests (capped at 10)
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("USAspending MCP - Environment Variables");
    println!();
    println!("API:");
    println!("  USASPENDING__API__BASE_URL              API root (default: https://api.usaspending.gov/api/v2/)");
    println!("  USASPENDING__API__TIMEOUT_SECS          Per-request timeout in seconds (default: 30)");
    println!("  USASPENDING__API__CONNECT_TIMEOUT_SECS  Connect timeout in seconds (default: 10)");
    println!("  USASPENDING__API__USER_AGENT            Custom User-Agent header");
    println!();
    println!("Tools:");
    println!("  USASPENDING__TOOLS__DEFAULT_PAGES_TO_FETCH  Default page budget for award search (default: 3)");
    println!("  USASPENDING__TOOLS__DEFAULT_MAX_CONCURRENT  Default award detail concurrency (default: 10)");
    println!();
    println!("Logging:");
    println!("  USASPENDING__LOGGING__LEVEL   Log level when RUST_LOG is unset (default: info)");
    println!("  USASPENDING__LOGGING__FORMAT  'text' or 'json' (default: text)");
    println!("  RUST_LOG                      Rust logging filter (e.g., debug, usaspending_mcp=trace)");
    println!();
    println!("Proxy:");
    println!("  HTTP_PROXY / HTTPS_PROXY / NO_PROXY  Honoured by the HTTP client");
}

/// Logs go to stderr: stdout carries the stdio MCP transport
fn init_tracing(verbose: u8, quiet: bool, logging: &LoggingConfig) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("usaspending_mcp={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Read a JSON argument given inline or as `@path`
fn read_json_arg(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Request is not valid JSON")
}

fn search_args(request: Value, pages: Option<u32>) -> Value {
    let mut args = Map::new();
    args.insert("award_search_request".to_string(), request);
    if let Some(pages) = pages {
        args.insert("pages_to_fetch".to_string(), pages.into());
    }
    Value::Object(args)
}

fn details_args(award_ids: Vec<String>, max_concurrent: Option<usize>) -> Value {
    let mut args = Map::new();
    args.insert("award_ids".to_string(), award_ids.into());
    if let Some(max) = max_concurrent {
        args.insert("max_concurrent".to_string(), max.into());
    }
    Value::Object(args)
}

fn print_result(result: &Value) -> Result<()> {
    match result {
        Value::String(message) => println!("{}", message),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config: Config = load_config(config_path.as_deref())
        .with_context(|| match &config_path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config from environment".to_string(),
        })?;

    init_tracing(cli.verbose, cli.quiet, &config.logging);
    if let Some(path) = &config_path {
        info!("Using config file: {}", path.display());
    }

    let client = UsaSpendingClient::from_config(&config.api)?;
    debug!(base_url = %client.base_url(), "USAspending client ready");
    let api = Arc::new(client);

    match cli.command.unwrap_or(Commands::Serve {
        stdio: false,
        http: false,
        port: 3000,
        host: "127.0.0.1".to_string(),
    }) {
        Commands::Serve {
            stdio: _,
            http,
            port,
            host,
        } => {
            let server = McpServer::new(api, config.tools)?;

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                info!("MCP server listening on {}", bound_addr);

                // Wait for the server to finish
                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
            info!("MCP server stopped");
        }

        Commands::Search { request, pages } => {
            let registry = ToolRegistry::new(api, config.tools);
            let args = search_args(read_json_arg(&request)?, pages);
            let result = registry.execute(SEARCH_SPENDING_BY_AWARD, args).await?;
            print_result(&result)?;
        }

        Commands::Awards {
            award_ids,
            max_concurrent,
        } => {
            let registry = ToolRegistry::new(api, config.tools);
            let args = details_args(award_ids, max_concurrent);
            let result = registry.execute(GET_AWARD_DETAILS, args).await?;
            print_result(&result)?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
