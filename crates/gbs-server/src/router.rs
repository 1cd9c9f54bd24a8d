use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the router. Pull and push routes exist only when the matching
/// repository is configured.
pub fn build_router(state: AppState, max_bundle_size: usize) -> Router {
    let mut router = Router::new()
        .route("/", get(handler::index_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/metrics", get(handler::metrics_handler));
    if state.source_repo.is_some() {
        router = router.route("/pull/*branch", get(handler::pull_handler));
    }
    if state.sink_repo.is_some() {
        router = router.route("/push/*branch", post(handler::push_handler));
    }
    router
        .layer(DefaultBodyLimit::max(max_bundle_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
