//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: user store, credential verifier, token service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and validation
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: extractors whose rejections use those responses

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;
use tracing::info;

use medibook_auth::{AuthorizationPolicy, PolicyError, Role};
use medibook_infra::UserStore;

use crate::config::ApiConfig;
use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let store = services::build_store(config).await?;
    build_app_with_store(config, store).await
}

/// Same router as [`build_app`], over a caller-supplied store.
pub async fn build_app_with_store(config: &ApiConfig, store: Arc<dyn UserStore>) -> anyhow::Result<Router> {
    build_app_with_routes(config, store, Router::new()).await
}

/// Mount `extra` next to the built-in routes, behind the same gate and policy.
pub async fn build_app_with_routes(
    config: &ApiConfig,
    store: Arc<dyn UserStore>,
    extra: Router,
) -> anyhow::Result<Router> {
    let services = Arc::new(services::AppServices::new(config, store)?);
    if let Some(admin) = &config.admin {
        services.bootstrap_admin(admin).await?;
    }

    let policy = default_policy()?;
    info!(rules = policy.rules().len(), "authorization policy loaded");

    let auth_state = AuthState {
        tokens: services.tokens.clone(),
        policy: Arc::new(policy),
    };

    // Gate runs first so the policy always sees a populated context. Both
    // wrap the fallback too, so unknown paths are 401 for anonymous callers.
    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .merge(extra)
        .fallback(errors::not_found)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(auth_state.clone(), middleware::auth_gate))
                .layer(from_fn_with_state(auth_state, middleware::enforce_policy)),
        ))
}

/// Route rules, checked in order; anything unmatched needs a principal.
pub fn default_policy() -> Result<AuthorizationPolicy, PolicyError> {
    AuthorizationPolicy::builder()
        .permit_preflight()
        .permit("GET", "/health")
        .permit("POST", "/auth/login")
        .permit("POST", "/api/patient/register")
        .permit("GET", "/api/doctors/specialties")
        .permit("GET", "/api/doctors/uploads/img/*")
        .permit("GET", "/api/patient/uploads/img/*")
        .permit("GET", "/api/doctors")
        .require_role("POST", "/api/doctors", Role::ADMIN)
        .build()
}
