//! rps_server - Unified CLI
//!
//! Serves rock-paper-scissors sessions over MCP (stdio or HTTP).

#![warn(missing_docs)]

use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;
use rps_server::{Cli, Command, GuardDirectory, ServerConfig, SessionServer};
use rps_sessions::SessionRegistry;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    match cli.command {
        Command::Server => {
            let config = config.with_overrides(None, None, cli.cancel_policy);
            init_tracing(&config);
            run_mcp_server(config).await
        }
        Command::Http { port, host } => {
            let config = config.with_overrides(host, port, cli.cancel_policy);
            init_tracing(&config);
            run_http_server(config).await
        }
    }
}

/// Installs the tracing subscriber. Logs go to stderr so stdio mode keeps
/// stdout for the MCP stream.
fn init_tracing(config: &ServerConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn shared_registry(config: &ServerConfig) -> Arc<SessionRegistry> {
    Arc::new(
        SessionRegistry::with_policy(config.cancel_policy().build())
            .with_event_capacity(*config.event_capacity()),
    )
}

/// Run the MCP session server (stdio mode)
#[instrument(skip_all, fields(cancel_policy = %config.cancel_policy()))]
async fn run_mcp_server(config: ServerConfig) -> Result<()> {
    info!("Starting rps MCP server");

    let server = SessionServer::with_state(shared_registry(&config), GuardDirectory::new());

    info!("Server ready - connect via MCP protocol");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

/// Run the MCP session server over streamable HTTP
#[instrument(skip_all, fields(host = %config.host(), port = config.port()))]
async fn run_http_server(config: ServerConfig) -> Result<()> {
    use axum::{Router, body::Body, http::Request};
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager,
        tower::{StreamableHttpServerConfig, StreamableHttpService},
    };
    use tower::ServiceBuilder;
    use tracing::debug;

    info!("Starting rps MCP server on HTTP");

    let session_manager = Arc::new(LocalSessionManager::default());

    // Registry and guards are shared by every connection
    let registry = shared_registry(&config);
    let guards = GuardDirectory::new();

    let mut http_config = StreamableHttpServerConfig::default();
    http_config.stateful_mode = true;
    debug!(?http_config, "HTTP service configuration");

    let http_service = StreamableHttpService::new(
        move || {
            debug!("Creating SessionServer instance with shared state");
            Ok(SessionServer::with_state(
                Arc::clone(&registry),
                guards.clone(),
            ))
        },
        session_manager,
        http_config,
    );

    let app = Router::new().fallback_service(
        ServiceBuilder::new()
            .map_request(|req: Request<Body>| {
                debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                req
            })
            .service(http_service),
    );

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!("Server ready at http://{}:{}/", config.host(), config.port());
    info!("Tools: start_session, cancel_session, join_session, complete_session, guard_status, list_sessions");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
