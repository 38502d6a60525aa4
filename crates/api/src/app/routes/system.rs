use axum::{Extension, Json, http::StatusCode};
use tracing::instrument;

use crate::app::dto::WhoAmIResponse;
use crate::context::SecurityContext;

#[instrument(skip_all, fields(method = "GET", path = "/health"))]
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Identity and authorities exactly as the request gate resolved them.
#[instrument(skip_all, fields(method = "GET", path = "/whoami"))]
pub async fn whoami(Extension(ctx): Extension<SecurityContext>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        identity: ctx.principal().map(|p| p.identity().to_string()).unwrap_or_default(),
        authorities: ctx.authorities().iter().map(|r| r.as_str().to_string()).collect(),
    })
}
