pub mod request_id;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::controllers::{
    health::HealthController, message::MessageController, speech::SpeechController,
};
use crate::domain::message::{MessageDispatcher, MessageWatcher};
use crate::infrastructure::config::Config;

/// Assemble every route. Chunk audio written under `audio_dir` is served
/// from `/audio/chunks`.
pub fn build_router(
    health_controller: Arc<HealthController>,
    message_controller: Arc<MessageController>,
    speech_controller: Arc<SpeechController>,
    audio_dir: &Path,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(HealthController::health))
        .route("/health/ready", get(HealthController::health_ready))
        .with_state(health_controller);

    let message_routes = Router::new()
        .route(
            "/api/messages/status/:roomId/:messageId",
            get(MessageController::status),
        )
        .route(
            "/api/messages/reprocess/:roomId/:messageId",
            post(MessageController::reprocess),
        )
        .route(
            "/api/messages/room/:roomId",
            get(MessageController::room_messages),
        )
        .with_state(message_controller);

    let speech_routes = Router::new()
        .route(
            "/api/voice-synthesis/test",
            post(SpeechController::test_synthesis),
        )
        .with_state(speech_controller);

    Router::new()
        .merge(health_routes)
        .merge(message_routes)
        .merge(speech_routes)
        .nest_service("/audio/chunks", ServeDir::new(audio_dir))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve until Ctrl-C, then stop the watcher and wait for in-flight jobs
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
    watcher: Arc<MessageWatcher>,
    dispatcher: Arc<MessageDispatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(
        in_flight_jobs = dispatcher.in_flight(),
        "Shutting down, draining background jobs"
    );
    watcher.stop().await;
    dispatcher.drain().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
