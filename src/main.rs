//! rolechat - streaming chat with an AI assistant or a user-authored persona
//!
//! A Rust backend implementing a conversation state machine that streams
//! model replies into live session state.

mod api;
mod auth;
mod config;
mod llm;
mod locale;
mod message;
mod persona;
mod prompt;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use auth::LocalAuth;
use config::AppConfig;
use llm::GenerationProvider;
use prompt::PromptSettings;
use runtime::{SessionManager, SessionOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolechat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Generation provider
    let provider = llm::build_provider(&config.llm, config.locale)?;
    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        locale = %config.locale,
        timeout = ?config.llm.generation_timeout,
        "Generation provider initialized"
    );

    // Auth boundary and sessions
    let auth = Arc::new(LocalAuth::new(&config.auth));
    auth.restore();

    let sessions = Arc::new(SessionManager::new(
        provider,
        PromptSettings {
            locale: config.locale,
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
        },
        SessionOptions {
            seed_welcome: true,
            generation_timeout: config.llm.generation_timeout,
        },
    ));

    let state = AppState::new(auth, sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("rolechat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
