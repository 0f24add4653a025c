use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_relay::config::{Cli, Config};
use chat_relay::server::{build_router, AppState};
use chat_relay::tools::ToolRegistry;
use chat_relay::upstream::OpenAiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Local secrets (API key) live in .env.local; a missing file is fine.
    let env_file = dotenvy::from_filename(".env.local").ok();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "chat_relay=debug,tower_http=debug"
    } else {
        "chat_relay=info,tower_http=info"
    };

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment file");
    }

    // Load configuration.
    let config = Arc::new(Config::load(&cli.config)?);

    info!(
        base_url = %config.upstream.base_url,
        model = %config.upstream.model,
        include_usage = config.upstream.include_usage,
        "Configuration loaded"
    );

    // One HTTP client for the provider and the tools.
    let client = OpenAiProvider::http_client(&config.upstream)?;
    let provider = OpenAiProvider::from_env(&config.upstream, client.clone());
    let tools = ToolRegistry::from_config(&config.tools, client);

    if tools.is_empty() {
        warn!("No tools configured; the model will answer with text only");
    } else {
        let names: Vec<&str> = tools.definitions().iter().map(|d| d.name.as_str()).collect();
        let local: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| tools.has_executor(name))
            .collect();
        info!(tools = ?names, local = ?local, "Tool registry ready");
    }

    // Build application state.
    let state = Arc::new(AppState {
        config: config.clone(),
        provider: Arc::new(provider),
        tools: Arc::new(tools),
        start_time: Instant::now(),
    });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.listen_addr(&cli);
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
