//! Health gate for routes that accept new work.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use beacon_health::HealthError;
use tracing::debug;

use crate::ApiState;
use crate::error::ApiError;

/// Refuse requests with 503 while the latest status is MAJOR.
///
/// Before the first tick the request is refused as "starting" rather than
/// treated as a caller error.
///
/// ```ignore
/// let guarded = Router::new()
///     .route("/v2/jobs", post(submit))
///     .layer(axum::middleware::from_fn_with_state(state.clone(), require_healthy));
/// ```
pub async fn require_healthy(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match state.health.assert_not_major() {
        Ok(()) => Ok(next.run(request).await),
        Err(HealthError::NotStarted) => {
            debug!(uri = %request.uri(), "request refused before first status");
            Err(ApiError::starting())
        }
        Err(e) => Err(e.into()),
    }
}
