use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, instrument, warn};

use medibook_auth::AuthFailure;
use medibook_core::Email;

use crate::app::{
    dto::{LoginRequest, LoginResponse, UserProfile},
    errors,
    extract::ApiJson,
    services::{AppServices, LoginError},
};
use crate::context::CurrentPrincipal;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/user_actual", get(user_actual))
}

#[instrument(skip_all, fields(method = "POST", path = "/auth/login"))]
pub async fn login(Extension(services): Extension<Arc<AppServices>>, ApiJson(req): ApiJson<LoginRequest>) -> Response {
    match services.login(&req.email, &req.password).await {
        Ok(issued) => Json(LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.claims.expires_at,
        })
        .into_response(),
        Err(LoginError::Auth(AuthFailure::InvalidCredentials | AuthFailure::AccountDisabled)) => {
            errors::bad_credentials()
        }
        Err(LoginError::Auth(AuthFailure::Lookup(e))) => {
            warn!(error = %e, "login aborted: identity store unavailable");
            errors::internal_error()
        }
        Err(LoginError::Issue(e)) => {
            error!(error = %e, "failed to issue token");
            errors::internal_error()
        }
    }
}

/// Profile of the calling principal.
#[instrument(skip_all, fields(method = "GET", path = "/auth/user_actual"))]
pub async fn user_actual(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Response {
    let Ok(email) = Email::parse(principal.identity()) else {
        return errors::unauthorized();
    };

    match services.store.find_by_email(&email).await {
        Ok(Some(record)) => Json(UserProfile::from(record)).into_response(),
        // Removed between the gate's lookup and this one.
        Ok(None) => errors::unauthorized(),
        Err(e) => errors::store_error(e),
    }
}
