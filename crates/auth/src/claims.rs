use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Role, TokenFailure};

/// JWT claims model.
///
/// Timestamps travel as the registered numeric `iat`/`exp` claims (seconds
/// since the epoch). `roles` is informational for clients; the server always
/// re-resolves roles from the principal store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the principal's identity (login email).
    pub sub: String,

    /// Roles granted at issuance.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Deterministically validate the claim time window.
///
/// A token is expired from the instant `now` reaches `expires_at`. This runs
/// only after the signature has been verified.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenFailure> {
    if claims.sub.is_empty() || claims.expires_at <= claims.issued_at {
        return Err(TokenFailure::Malformed);
    }
    if now >= claims.expires_at {
        return Err(TokenFailure::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn claims(iat: i64, exp: i64) -> JwtClaims {
        JwtClaims {
            sub: "doc@x.com".into(),
            roles: vec![Role::DOCTOR],
            issued_at: Utc.timestamp_opt(iat, 0).unwrap(),
            expires_at: Utc.timestamp_opt(exp, 0).unwrap(),
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let c = claims(1_000, 2_000);
        let exp = c.expires_at;
        assert_eq!(validate_claims(&c, exp - Duration::seconds(1)), Ok(()));
        assert_eq!(validate_claims(&c, exp), Err(TokenFailure::Expired));
        assert_eq!(validate_claims(&c, exp + Duration::days(1)), Err(TokenFailure::Expired));
    }

    #[test]
    fn inverted_window_or_empty_subject_is_malformed() {
        let now = Utc.timestamp_opt(1_500, 0).unwrap();
        assert_eq!(validate_claims(&claims(2_000, 2_000), now), Err(TokenFailure::Malformed));

        let mut c = claims(1_000, 2_000);
        c.sub.clear();
        assert_eq!(validate_claims(&c, now), Err(TokenFailure::Malformed));
    }

    #[test]
    fn serializes_registered_claim_names() {
        let json = serde_json::to_value(claims(1_000, 2_000)).unwrap();
        assert_eq!(json["iat"], 1_000);
        assert_eq!(json["exp"], 2_000);
        assert_eq!(json["roles"][0], "ROLE_DOCTOR");
    }
}
