//! Voice playground - control API entry point
//!
//! Reads the page URL from the environment, wires the connection controller
//! to the remote services and serves the control API.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_playground::{
    api::{self, AppState},
    config::Config,
    context::ContextClient,
    identity::PageParams,
    playground::{PlaygroundState, PlaygroundStore},
    token::TokenClient,
    ConnectionController,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_playground=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: token_endpoint={}, context_api_base={}",
        config.token_endpoint, config.context_api_base
    );

    let initial = match config.load_instructions()? {
        Some(instructions) => {
            info!("Using base instructions from {:?}", config.instructions_file);
            PlaygroundState::with_instructions(instructions)
        }
        None => PlaygroundState::default(),
    };
    let store = Arc::new(PlaygroundStore::new(initial));

    let params = PageParams::from_url(&config.page_url);
    if !params.has_credential() {
        warn!("Page URL carries no apiKey or goqiiAccessToken; connect will fail");
    }

    let context = ContextClient::new(config.context_api_base.clone(), config.http_timeout)?;
    let tokens = TokenClient::new(config.token_endpoint.clone(), config.http_timeout)?;
    let controller = Arc::new(ConnectionController::new(
        Arc::clone(&store),
        params,
        Arc::new(context),
        Arc::new(tokens),
    ));

    let shutdown = CancellationToken::new();
    let watcher = controller.watch_credential(shutdown.clone());

    if config.auto_connect {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Some(Err(e)) = controller.auto_connect().await {
                warn!("Auto-connect failed: {}", e);
            }
        });
    }

    let state = Arc::new(AppState {
        config,
        controller,
        store,
    });
    api::serve(state, shutdown).await?;

    if let Err(e) = watcher.await {
        warn!("Credential watcher ended abnormally: {}", e);
    }
    Ok(())
}
