use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::instrument;

use medibook_auth::Role;
use medibook_core::UserId;

use crate::app::{
    dto::{RegisterPatientRequest, UserProfile},
    errors,
    extract::ApiJson,
    services::{AppServices, ProfileExtras},
};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/:id", get(get_patient))
}

#[instrument(skip_all, fields(method = "POST", path = "/api/patient/register"))]
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(req): ApiJson<RegisterPatientRequest>,
) -> Response {
    let valid = match req.validate() {
        Ok(v) => v,
        Err(errs) => return errors::validation_errors(errs),
    };
    let extras = ProfileExtras {
        photo: req.photo,
        ..ProfileExtras::default()
    };

    match services.register(valid, extras, Role::PATIENT).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "patient registered",
                "patient": UserProfile::from(record),
            })),
        )
            .into_response(),
        Err(e) => errors::registration_error(e),
    }
}

#[instrument(skip_all, fields(method = "GET", path = "/api/patient/:id"))]
pub async fn get_patient(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let id: UserId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"),
    };

    match services.store.find_by_id(id).await {
        Ok(Some(record)) => Json(UserProfile::from(record)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::store_error(e),
    }
}
