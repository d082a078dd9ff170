use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

pub mod query;
pub mod records;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the `/data` API. Static segments (`filter`, `stats`) win over `:id`.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/data", get(records::list).post(records::create))
        .route("/data/filter", get(query::filter))
        .route("/data/stats", get(query::stats))
        .route(
            "/data/:id",
            get(records::show)
                .put(records::update)
                .delete(records::remove),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run a state operation on the blocking pool. Writes rewrite the dataset
/// file while holding the lock, so every handler (reads included) waits for
/// the lock there instead of on an async worker.
async fn blocking<T, F>(op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
}
