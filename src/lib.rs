//! clima-relay: receives weather-station readings, asks a text-generation
//! service for an insight about them, and keeps the latest pair in memory.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod genai;
pub mod server;

pub use cache::{LatestReadingStore, Snapshot};
pub use config::RelayConfig;
pub use domain::{IngestResponse, LatestResponse, SensorReading};
pub use error::{ConfigError, GenAiError};
pub use genai::{GeminiClient, InsightGenerator};
pub use server::{router, AppState};

/// Initialize tracing. `RUST_LOG` wins over the configured default level.
pub fn init_logging(default_level: &str) {
    // a second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init();
}
