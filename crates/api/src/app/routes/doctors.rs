use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::instrument;

use medibook_auth::Role;

use crate::app::{
    dto::{RegisterDoctorRequest, UserProfile},
    errors,
    extract::ApiJson,
    services::{AppServices, ProfileExtras},
};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(register))
        .route("/specialties", get(specialties))
}

#[instrument(skip_all, fields(method = "GET", path = "/api/doctors"))]
pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store.list_by_role(&Role::DOCTOR).await {
        Ok(records) => Json(records.into_iter().map(UserProfile::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error(e),
    }
}

/// Administrators register doctors; the policy layer enforces `ROLE_ADMIN`.
#[instrument(skip_all, fields(method = "POST", path = "/api/doctors"))]
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(req): ApiJson<RegisterDoctorRequest>,
) -> Response {
    let valid = match req.validate() {
        Ok(v) => v,
        Err(errs) => return errors::validation_errors(errs),
    };
    let extras = ProfileExtras {
        phone: req.phone,
        sex: req.sex,
        specialty: req.specialty,
        photo: req.photo,
    };

    match services.register(valid, extras, Role::DOCTOR).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "doctor registered",
                "doctor": UserProfile::from(record),
            })),
        )
            .into_response(),
        Err(e) => errors::registration_error(e),
    }
}

#[instrument(skip_all, fields(method = "GET", path = "/api/doctors/specialties"))]
pub async fn specialties(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.store.list_specialties().await {
        Ok(list) => Json(list).into_response(),
        Err(e) => errors::store_error(e),
    }
}
