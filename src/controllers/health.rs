use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::message::MessageWatcher;
use crate::domain::speech::SpeechServiceApi;
use crate::infrastructure::db::{check_connection, DbPool};

/// How readiness checks reach the message store
#[derive(Clone)]
pub enum StoreProbe {
    Postgres(Arc<DbPool>),
    Memory,
}

impl StoreProbe {
    fn backend(&self) -> &'static str {
        match self {
            StoreProbe::Postgres(_) => "postgres",
            StoreProbe::Memory => "memory",
        }
    }

    async fn is_connected(&self) -> bool {
        match self {
            StoreProbe::Postgres(pool) => match check_connection(pool).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Database health check failed");
                    false
                }
            },
            StoreProbe::Memory => true,
        }
    }
}

pub struct HealthController {
    store: StoreProbe,
    speech: Arc<dyn SpeechServiceApi>,
    watcher: Arc<MessageWatcher>,
}

impl HealthController {
    pub fn new(
        store: StoreProbe,
        speech: Arc<dyn SpeechServiceApi>,
        watcher: Arc<MessageWatcher>,
    ) -> Self {
        Self {
            store,
            speech,
            watcher,
        }
    }

    pub async fn health() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// GET /health/ready - Store, synthesis provider and watcher status.
    /// Synthesis being down degrades audio but does not make the service unready.
    pub async fn health_ready(
        State(controller): State<Arc<HealthController>>,
    ) -> impl IntoResponse {
        let store_connected = controller.store.is_connected().await;
        let synthesis = controller.speech.synthesis_status().await;
        let watcher = controller.watcher.status();

        let ready = store_connected && watcher.running;
        let status = if ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        (
            status,
            Json(json!({
                "status": if ready { "ready" } else { "not_ready" },
                "store": {
                    "backend": controller.store.backend(),
                    "status": if store_connected { "connected" } else { "disconnected" },
                },
                "synthesis": synthesis,
                "watcher": watcher,
            })),
        )
    }
}
