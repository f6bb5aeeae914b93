//! HTTP server assembly — router, middleware, and the serve loop.

use std::future::Future;
use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::Database;
use crate::todos::{TodoRouteState, todo_routes};

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "todo-list"
    }))
}

/// Build the full application router over the given store.
pub fn app(db: Arc<dyn Database>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(todo_routes(TodoRouteState::new(db)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Serve the application on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    db: Arc<dyn Database>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(%addr, "Todo API listening");
    axum::serve(listener, app(db))
        .with_graceful_shutdown(shutdown)
        .await
}
