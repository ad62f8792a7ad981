use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use ollama_chat_relay::backend::ChatBackend;
use ollama_chat_relay::config::{Cli, Config};
use ollama_chat_relay::mock::MockResponder;
use ollama_chat_relay::relay::UpstreamClient;
use ollama_chat_relay::server::chat_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "ollama_chat_relay=debug,tower_http=debug"
    } else {
        "ollama_chat_relay=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    info!("ollama-chat-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    info!(
        upstream = %config.upstream.url,
        model = %config.upstream.model,
        mode = ?config.upstream.mode,
        timeout_secs = config.upstream.timeout_secs,
        mock = config.mock.enabled,
        "Configuration loaded"
    );

    let backend: Arc<dyn ChatBackend> = if config.mock.enabled {
        Arc::new(MockResponder::new(&config.mock))
    } else {
        Arc::new(UpstreamClient::new(&config.upstream)?)
    };
    info!(backend = %backend.describe(), "Chat backend ready");

    let state = Arc::new(AppState::new(backend)?);
    let app = build_router(state, &config.server);

    let listen_addr = cli.listen;
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
