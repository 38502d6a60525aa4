//! Request Gate and policy enforcement.
//!
//! Both run on every request, gate first:
//! 1. `auth_gate` turns an optional bearer token into a `SecurityContext`.
//!    It never rejects.
//! 2. `enforce_policy` evaluates the route rules against that context and
//!    short-circuits with the fixed 401/403 responses.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, error, instrument};

use medibook_auth::{AuthorizationPolicy, AuthzError, TokenFailure, TokenValidator, authorize};

use crate::app::errors;
use crate::context::SecurityContext;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenValidator>,
    pub policy: Arc<AuthorizationPolicy>,
}

#[instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
pub async fn auth_gate(State(state): State<AuthState>, mut req: Request<Body>, next: Next) -> Response {
    // Owned so no borrow of the (non-Sync) request is held across the await.
    let token = extract_bearer(req.headers()).map(str::to_owned);

    let context = match token {
        None => SecurityContext::anonymous(),
        Some(token) => match state.tokens.validate(&token, Utc::now()).await {
            Ok(principal) => SecurityContext::authenticated(principal),
            Err(TokenFailure::Lookup(e)) => {
                error!(error = %e, "token subject lookup failed");
                SecurityContext::anonymous()
            }
            Err(failure) => {
                debug!(reason = failure.kind(), "bearer token rejected");
                SecurityContext::anonymous()
            }
        },
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}

#[instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
pub async fn enforce_policy(State(state): State<AuthState>, req: Request<Body>, next: Next) -> Response {
    let access = state.policy.access_for(req.method().as_str(), req.uri().path());
    let principal = req
        .extensions()
        .get::<SecurityContext>()
        .and_then(SecurityContext::principal);

    match authorize(access, principal) {
        Ok(()) => next.run(req).await,
        Err(AuthzError::Unauthenticated) => {
            debug!("anonymous request to protected route");
            errors::unauthorized()
        }
        Err(AuthzError::Forbidden(role)) => {
            debug!(required = %role, "principal lacks role");
            errors::forbidden()
        }
    }
}

/// Token from `Authorization: Bearer <token>`.
///
/// Any other shape (missing header, other scheme, empty token, non-ASCII)
/// counts as "no token": the request proceeds anonymously.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}
