use thiserror::Error;

use crate::{Access, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No principal in the security context.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the policy demands a role the principal lacks.
    #[error("forbidden: missing role '{0}'")]
    Forbidden(String),
}

/// Decide whether a caller satisfies an access requirement.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(access: &Access, principal: Option<&Principal>) -> Result<(), AuthzError> {
    match (access, principal) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(AuthzError::Unauthenticated),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Role(role), Some(p)) if p.has_role(role) => Ok(()),
        (Access::Role(role), Some(_)) => Err(AuthzError::Forbidden(role.as_str().to_string())),
    }
}
