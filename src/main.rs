//! reqctx — request-scoped context server
//!
//! Runs a small HTTP server with the context middleware mounted, so the
//! store bound to each request can be inspected at `GET /context`.
//!
//! Usage:
//!   reqctx                                         # Default port 7070, empty stores
//!   reqctx --use-headers                           # Fill stores from X-Request-Id / X-Session-Id
//!   reqctx --use-headers --header traceId=X-Trace  # Custom key → header mapping
//!   reqctx --config middleware.json                # Load middleware options from JSON

use std::path::PathBuf;

use clap::Parser;
use reqctx_core::ContextStorage;
use reqctx_http::{ContextServer, ServerConfig};
use reqctx_middleware::MiddlewareConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqctx", about = "Request-scoped context server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "7070")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Middleware configuration file (JSON: useHeaders, headerNames)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Populate each request's store from its headers
    #[arg(long)]
    use_headers: bool,

    /// Store key to header mapping, KEY=Header-Name (repeatable, replaces the defaults)
    #[arg(long = "header", value_name = "KEY=HEADER", value_parser = parse_header_mapping)]
    headers: Vec<(String, String)>,

    /// Enable permissive CORS
    #[arg(long)]
    cors: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn parse_header_mapping(arg: &str) -> Result<(String, String), String> {
    let (key, header) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=HEADER, got `{arg}`"))?;
    let (key, header) = (key.trim(), header.trim());
    if key.is_empty() || header.is_empty() {
        return Err(format!("expected KEY=HEADER, got `{arg}`"));
    }
    Ok((key.to_string(), header.to_string()))
}

/// Merge the config file (if any) with command-line overrides.
fn middleware_config(cli: &Cli) -> Result<MiddlewareConfig, reqctx_middleware::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => MiddlewareConfig::from_file(path)?,
        None => MiddlewareConfig::default(),
    };

    if cli.use_headers {
        config = config.with_headers(true);
    }
    if !cli.headers.is_empty() {
        config = config.with_header_names(cli.headers.iter().cloned());
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    if cli.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let middleware = match middleware_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid middleware configuration: {e}");
            std::process::exit(1);
        }
    };

    info!(
        use_headers = middleware.use_headers,
        headers = ?middleware.header_names,
        "Middleware configured"
    );

    // One propagation authority for the whole process
    let storage = ContextStorage::create();

    let config = ServerConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        enable_cors: cli.cors,
        middleware,
    };

    let mut server = match ContextServer::start(config, storage).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!();
    println!("  Server running!");
    println!();
    println!("  Context endpoint:");
    println!("    http://{}:{}/context", cli.hostname, server.port());
    println!();
    println!("  Press Ctrl+C to stop.");
    println!();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
    }

    println!();
    println!("  Shutting down...");
    server.stop().await;
    println!("  Server stopped.");
}
