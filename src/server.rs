//! ==============================================================================
//! server.rs - http endpoints
//! ==============================================================================
//!
//! routes:
//!     POST /api/dados           ingest a reading, return the generated insight
//!     GET  /api/dados/ultimos   last reading + insight + timestamp
//!     GET  /healthz             liveness probe
//!
//! flow (ingest):
//!
//! ```text
//!     client ──► decode ──► prompt ──► generator ──► store.commit ──► {status: ok}
//!                  │                       │
//!                  ▼                       ▼
//!             4xx + error            {status: error}, store untouched
//! ```
//!
//! the generator call and the commit run in their own task, so a client
//! hanging up does not cancel an upstream call that is already in flight,
//! and a panic inside a generator becomes an error envelope.
//!
//! ==============================================================================

use crate::cache::LatestReadingStore;
use crate::config::CorsConfig;
use crate::domain::{IngestResponse, LatestResponse, SensorReading};
use crate::error::{ConfigError, GenAiError};
use crate::genai::InsightGenerator;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderValue,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub const NO_DATA_MESSAGE: &str = "no data available";
const INTERNAL_ERROR_MESSAGE: &str = "internal error while generating insight";

// ==============================================================================
// shared state
// ==============================================================================
// handed to every handler by axum. both fields are cheap clones of shared
// handles: the store is an Arc<RwLock<..>> and the generator an Arc<dyn ..>.

#[derive(Clone)]
pub struct AppState {
    pub store: LatestReadingStore,
    pub generator: Arc<dyn InsightGenerator>,
    /// log full payloads instead of a one-line summary
    pub show_sensor_data: bool,
}

impl AppState {
    pub fn new(store: LatestReadingStore, generator: Arc<dyn InsightGenerator>) -> Self {
        Self { store, generator, show_sensor_data: true }
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/dados", post(ingest_handler))
        .route("/api/dados/ultimos", get(latest_handler))
        .route("/healthz", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// any origin by default, otherwise only the configured ones
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, ConfigError> {
    if config.allows_any() {
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

// ==============================================================================
// handlers
// ==============================================================================

/// POST /api/dados
async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<SensorReading>, JsonRejection>,
) -> Response {
    let Json(reading) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let message = rejection.body_text();
            tracing::warn!(status = %rejection.status(), error = %message, "rejected sensor payload");
            return (rejection.status(), Json(IngestResponse::Error { message })).into_response();
        }
    };

    let task = tokio::spawn(ingest(state, reading));
    let response = match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "ingestion task failed");
            IngestResponse::Error { message: INTERNAL_ERROR_MESSAGE.to_string() }
        }
    };
    Json(response).into_response()
}

/// prompt -> generator -> commit. never touches the store on failure.
pub async fn ingest(state: AppState, reading: SensorReading) -> IngestResponse {
    if state.show_sensor_data {
        tracing::info!(?reading, "received sensor payload");
    } else {
        tracing::info!("received sensor payload");
    }

    let prompt = reading.to_prompt();
    let generated = state.generator.generate(&prompt).await.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(GenAiError::EmptyResponse)
        } else {
            Ok(trimmed.to_string())
        }
    });

    match generated {
        Ok(insight) => {
            let snapshot = state.store.commit(reading, insight.clone()).await;
            tracing::info!(timestamp = %snapshot.timestamp, %insight, "insight generated");
            IngestResponse::Ok { insight }
        }
        Err(e) => {
            tracing::warn!(error = %e, "insight generation failed");
            IngestResponse::Error { message: e.user_message().to_string() }
        }
    }
}

/// GET /api/dados/ultimos
async fn latest_handler(State(state): State<AppState>) -> Json<LatestResponse> {
    let response = match state.store.latest().await {
        Some(snapshot) => LatestResponse::Ok {
            timestamp: snapshot.timestamp,
            dados: snapshot.reading,
            insight: snapshot.insight,
        },
        None => LatestResponse::Error { message: NO_DATA_MESSAGE.to_string() },
    };
    Json(response)
}

/// GET /healthz
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl InsightGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, GenAiError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl InsightGenerator for Failing {
        async fn generate(&self, _prompt: &str) -> Result<String, GenAiError> {
            Err(GenAiError::Quota)
        }
    }

    fn reading() -> SensorReading {
        SensorReading {
            temperatura: 20.0,
            umidade: 40.0,
            pressao: 1010.0,
            frequencia_vento: 0.5,
            direcao_encoder: "N".to_string(),
            posicao_encoder: 0,
        }
    }

    #[tokio::test]
    async fn test_ingest_trims_and_commits() {
        let state = AppState::new(LatestReadingStore::new(), Arc::new(Fixed("  Céu limpo.\n")));
        let response = ingest(state.clone(), reading()).await;
        assert_eq!(response, IngestResponse::Ok { insight: "Céu limpo.".to_string() });
        assert_eq!(state.store.latest().await.unwrap().insight, "Céu limpo.");
    }

    #[tokio::test]
    async fn test_ingest_blank_text_is_an_error() {
        let state = AppState::new(LatestReadingStore::new(), Arc::new(Fixed(" \t ")));
        let response = ingest(state.clone(), reading()).await;
        assert!(matches!(response, IngestResponse::Error { .. }));
        assert!(state.store.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_ingest_failure_uses_generic_message() {
        let state = AppState::new(LatestReadingStore::new(), Arc::new(Failing));
        let response = ingest(state.clone(), reading()).await;
        assert_eq!(
            response,
            IngestResponse::Error { message: GenAiError::Quota.user_message().to_string() }
        );
        assert!(state.store.latest().await.is_none());
    }

    #[test]
    fn test_cors_allow_list() {
        let config = CorsConfig { allowed_origins: vec!["https://estacao.example".to_string()] };
        assert!(cors_layer(&config).is_ok());

        let bad = CorsConfig { allowed_origins: vec!["bad\norigin".to_string()] };
        assert!(matches!(cors_layer(&bad), Err(ConfigError::InvalidOrigin(_))));
    }
}
