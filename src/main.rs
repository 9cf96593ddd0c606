//! ==============================================================================
//! main.rs - relay entry point
//! ==============================================================================
//!
//! purpose:
//!     wires configuration, the generation client and the single-slot store
//!     into the http server, then serves until ctrl-c.
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                    relay (this binary)                    │
//!     │  ┌──────────────┐   ┌───────────────┐   ┌──────────────┐  │
//!     │  │ POST         │──►│ GeminiClient  │──►│ Latest       │  │
//!     │  │ /api/dados   │   │ (reqwest)     │   │ ReadingStore │  │
//!     │  └──────────────┘   └───────────────┘   └──────┬───────┘  │
//!     │  ┌──────────────────────┐                      │          │
//!     │  │ GET /api/dados/      │◄─────────────────────┘          │
//!     │  │ ultimos              │                                 │
//!     │  └──────────────────────┘                                 │
//!     └──────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::{Context, Result};
use clima_relay::{server, GeminiClient, LatestReadingStore, RelayConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Clima Relay - weather station insights");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = RelayConfig::load_or_default()?;
    config.apply_env(|key| std::env::var(key).ok());
    config.print_summary();

    clima_relay::init_logging(&config.logging.level);

    // step 2: resolve everything that can fail before binding
    let api_key = config.api_key()?;
    let addr = config.bind_addr()?;
    let cors = server::cors_layer(&config.cors)?;

    // step 3: generation client + shared store
    let generator = GeminiClient::new(&config.genai, api_key)
        .context("failed to build generation client")?;
    tracing::info!(model = generator.model(), "generation client ready");

    let mut state = server::AppState::new(LatestReadingStore::new(), Arc::new(generator));
    state.show_sensor_data = config.logging.show_sensor_data;

    // step 4: serve
    let app = server::router(state, cors);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
