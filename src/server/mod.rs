//! HTTP JSON API for decks, cards, reviews and analytics.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::study::StudyService;

pub use error::{ApiError, ApiErrorBody, ApiResult};
pub use handlers::{BulkCreateRequest, DueCount, ReviewRequest};

/// Build the API router over a shared service
pub fn router(service: Arc<StudyService>) -> Router {
    let deck = "/api/users/{user_id}/decks/{deck_id}";
    let card = "/api/users/{user_id}/decks/{deck_id}/cards/{card_id}";

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/decks/public", get(handlers::list_public_decks))
        .route(
            "/api/users/{user_id}/decks",
            get(handlers::list_decks).post(handlers::create_deck),
        )
        .route(
            deck,
            get(handlers::get_deck)
                .patch(handlers::update_deck)
                .delete(handlers::delete_deck),
        )
        .route(&format!("{}/due-cards", deck), get(handlers::due_card_count))
        .route(
            &format!("{}/cards", deck),
            get(handlers::list_cards).post(handlers::create_card),
        )
        .route(&format!("{}/cards/bulk", deck), post(handlers::bulk_create_cards))
        .route(&format!("{}/cards/due", deck), get(handlers::due_cards))
        .route(
            card,
            get(handlers::get_card)
                .patch(handlers::update_card)
                .delete(handlers::delete_card),
        )
        .route(&format!("{}/review", card), post(handlers::review_card))
        .route(&format!("{}/reset", card), post(handlers::reset_card))
        .route("/api/users/{user_id}/analytics/overview", get(handlers::overview))
        .route("/api/users/{user_id}/analytics/activity", get(handlers::activity))
        .route(
            "/api/users/{user_id}/analytics/refresh-activity",
            post(handlers::refresh_activity),
        )
        .route("/api/users/{user_id}/analytics/heatmap", get(handlers::heatmap))
        .route("/api/users/{user_id}/analytics/streak", get(handlers::streak))
        .route(
            "/api/users/{user_id}/analytics/decks/{deck_id}",
            get(handlers::deck_stats),
        )
        .with_state(service)
        .layer(CorsLayer::permissive())
}

/// Handle for a running API server
pub struct ApiServer {
    /// Address the server is listening on
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server gracefully and wait for in-flight requests
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            log::warn!("API server task ended abnormally: {}", e);
        }
    }
}

/// Bind `addr` (port 0 picks a free port) and serve in the background
pub async fn start_server(service: Arc<StudyService>, addr: SocketAddr) -> std::io::Result<ApiServer> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let app = router(service);

    log::info!("API server listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("API server shutting down");
            })
            .await;
        if let Err(e) = result {
            log::error!("API server error: {}", e);
        }
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
