use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use medibook_infra::StoreError;

use crate::app::services::RegistrationError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 401 for any request that needed a principal and had none.
///
/// The body is the same whatever went wrong with the token; the reason is
/// only logged.
pub fn unauthorized() -> Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    res.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

pub fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient authority")
}

/// Failed login. Unknown email, wrong password and disabled accounts all map here.
pub fn bad_credentials() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "bad_credentials", "invalid email or password")
}

pub fn validation_errors(errors: Vec<String>) -> Response {
    (StatusCode::BAD_REQUEST, axum::Json(json!({ "errors": errors }))).into_response()
}

pub fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::EmailInUse => json_error(StatusCode::CONFLICT, "email_in_use", "email already registered"),
        StoreError::Backend(msg) => {
            error!(error = %msg, "user store failure");
            internal_error()
        }
    }
}

pub fn registration_error(err: RegistrationError) -> Response {
    match err {
        RegistrationError::Store(e) => store_error(e),
        RegistrationError::Hash(e) => {
            error!(error = %e, "password hashing failed");
            internal_error()
        }
    }
}

pub fn internal_error() -> Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}
