use crate::http::handlers::{ops, payments};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// `POST /payment`, `GET /health`, and static assets from `static_dir` for
/// everything else (`/` resolves to `index.html`).
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/health", get(ops::health))
        .route("/payment", post(payments::create_payment))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
