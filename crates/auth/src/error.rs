//! Failure taxonomy of the authentication layer.
//!
//! The variants carry the *internal* reason for a rejection. They are meant
//! for logs and diagnostics; the HTTP layer collapses all of them into a
//! fixed "authentication required" response.

use thiserror::Error;

/// The principal store could not answer a lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// Login-time failures (credential verification).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Unknown identity or wrong secret. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled")]
    AccountDisabled,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Request-time failures (bearer token validation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenFailure {
    #[error("malformed token")]
    Malformed,

    #[error("token signature invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token subject no longer exists")]
    UnknownSubject,

    #[error("token subject is disabled or locked")]
    SubjectDisabled,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl TokenFailure {
    /// Stable short name used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenFailure::Malformed => "malformed",
            TokenFailure::SignatureInvalid => "signature_invalid",
            TokenFailure::Expired => "expired",
            TokenFailure::UnknownSubject => "unknown_subject",
            TokenFailure::SubjectDisabled => "subject_disabled",
            TokenFailure::Lookup(_) => "lookup_failed",
        }
    }
}

/// Token could not be minted.
#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token ttl out of range")]
    TtlOutOfRange,
}

/// Secret hashing failure (salt generation or hash encoding).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(pub String);
