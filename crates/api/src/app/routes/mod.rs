use axum::{Router, routing::get};

pub mod auth;
pub mod doctors;
pub mod patients;
pub mod system;

/// Router for every endpoint behind the request gate.
///
/// Access rules live in the authorization policy, not here: a route being
/// mounted says nothing about who may call it.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/auth", auth::router())
        .nest("/api/patient", patients::router())
        .nest("/api/doctors", doctors::router())
}
