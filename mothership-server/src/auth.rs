//! Bearer token guard for the GM routes.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

/// Pass the request on when it carries the configured GM token. With no
/// token configured every request passes.
pub async fn require_gm(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.gm_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        Ok(next.run(request).await)
    } else {
        warn!(path = %request.uri().path(), "rejected GM request");
        Err(ApiError::Unauthorized)
    }
}
