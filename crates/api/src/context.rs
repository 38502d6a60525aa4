use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use medibook_auth::{Principal, Role};

use crate::app::errors;

/// Security context for a single request.
///
/// Inserted as a request extension by the auth gate and dropped with the
/// request. Anonymous when no valid bearer token was presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Granted authorities; empty for anonymous requests.
    pub fn authorities(&self) -> &[Role] {
        self.principal.as_ref().map(Principal::roles).unwrap_or(&[])
    }
}

/// Extractor for handlers that need the authenticated principal.
///
/// The policy layer already rejects anonymous calls to protected routes; this
/// rejection only fires if a handler is mounted on a public route by mistake.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::principal)
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(errors::unauthorized)
    }
}
