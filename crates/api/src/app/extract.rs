use axum::{
    Json,
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::app::errors;

/// `Json<T>` whose rejections use the API error body.
///
/// The parser's message is logged, never echoed back to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_response(rejection)),
        }
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    debug!(detail = %rejection.body_text(), "request body rejected");

    match rejection {
        JsonRejection::MissingJsonContentType(_) => errors::json_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            "expected content-type application/json",
        ),
        JsonRejection::JsonSyntaxError(_) => {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", "request body is not valid JSON")
        }
        JsonRejection::JsonDataError(_) => errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            "request body has missing or mistyped fields",
        ),
        _ => errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", "request body could not be read"),
    }
}
