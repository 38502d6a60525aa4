//! Token Service: signed, time-bounded bearer tokens (JWT, HS256).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use crate::claims::{JwtClaims, validate_claims};
use crate::{IdentityLookup, Principal, TokenFailure, TokenIssueError};

/// HMAC signing key. Process-wide, read-only after startup.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningKeyError {
    #[error("signing key must be at least {min} bytes, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("failed to generate signing key: {0}")]
    Entropy(String),
}

impl SigningKey {
    pub const MIN_LEN: usize = 32;

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SigningKeyError> {
        let bytes = bytes.into();
        if bytes.len() < Self::MIN_LEN {
            return Err(SigningKeyError::TooShort {
                min: Self::MIN_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Fresh random key. Tokens signed with it do not survive a restart.
    pub fn generate() -> Result<Self, SigningKeyError> {
        let mut bytes = vec![0u8; Self::MIN_LEN];
        getrandom::getrandom(&mut bytes).map_err(|e| SigningKeyError::Entropy(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SigningKey(<{} bytes redacted>)", self.0.len())
    }
}

/// A freshly minted token plus the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
}

/// Validates bearer tokens presented on requests.
///
/// This is the seam the HTTP gate depends on, so it can hold any validator
/// behind `Arc<dyn TokenValidator>`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenFailure>;
}

pub struct TokenService<L> {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    lookup: L,
}

impl<L> TokenService<L>
where
    L: IdentityLookup,
{
    const ALGORITHM: Algorithm = Algorithm::HS256;

    pub fn new(key: &SigningKey, ttl: Duration, lookup: L) -> Self {
        let mut validation = Validation::new(Self::ALGORITHM);
        // Expiry is checked by `validate_claims` so "now == exp" is already expired.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(&key.0),
            decoding: DecodingKey::from_secret(&key.0),
            validation,
            ttl,
            lookup,
        }
    }

    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<IssuedToken, TokenIssueError> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or(TokenIssueError::TtlOutOfRange)?;
        let claims = JwtClaims {
            sub: principal.identity().to_string(),
            roles: principal.roles().to_vec(),
            issued_at: now,
            expires_at,
        };

        let token = jsonwebtoken::encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding)?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify signature and time window without consulting the store.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenFailure> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }

    /// Full validation: signature, expiry, then a fresh principal lookup.
    ///
    /// Roles embedded in the token are ignored; the returned principal is the
    /// store's current view, so role changes apply on the next request.
    pub async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenFailure> {
        let claims = self.decode(token, now)?;

        let principal = self
            .lookup
            .find_by_identity(&claims.sub)
            .await?
            .ok_or(TokenFailure::UnknownSubject)?;

        if !principal.is_active() {
            return Err(TokenFailure::SubjectDisabled);
        }

        Ok(principal)
    }
}

#[async_trait]
impl<L> TokenValidator for TokenService<L>
where
    L: IdentityLookup,
{
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenFailure> {
        TokenService::validate(self, token, now).await
    }
}

fn classify(kind: &ErrorKind) -> TokenFailure {
    let failure = match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenFailure::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenFailure::Expired,
        _ => TokenFailure::Malformed,
    };
    debug!(?kind, failure = failure.kind(), "token decode rejected");
    failure
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use super::*;
    use crate::{LookupError, Role, SecretHash};

    #[derive(Default)]
    struct MapLookup(RwLock<HashMap<String, Principal>>);

    impl MapLookup {
        fn put(&self, p: Principal) {
            self.0.write().unwrap().insert(p.identity().to_string(), p);
        }

        fn remove(&self, identity: &str) {
            self.0.write().unwrap().remove(identity);
        }
    }

    #[async_trait]
    impl IdentityLookup for MapLookup {
        async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, LookupError> {
            Ok(self.0.read().unwrap().get(identity).cloned())
        }
    }

    fn key(fill: u8) -> SigningKey {
        SigningKey::from_bytes(vec![fill; 32]).unwrap()
    }

    fn doctor() -> Principal {
        Principal::new("doc@x.com", SecretHash::from_phc("$argon2id$stub"), [Role::DOCTOR])
    }

    fn service(lookup: Arc<MapLookup>) -> TokenService<Arc<MapLookup>> {
        TokenService::new(&key(7), Duration::hours(1), lookup)
    }

    fn seeded() -> (Arc<MapLookup>, TokenService<Arc<MapLookup>>) {
        let lookup = Arc::new(MapLookup::default());
        lookup.put(doctor());
        let svc = service(lookup.clone());
        (lookup, svc)
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = SigningKey::from_bytes(b"dev-secret".to_vec()).unwrap_err();
        assert_eq!(err, SigningKeyError::TooShort { min: 32, actual: 10 });
        assert!(SigningKey::generate().is_ok());
    }

    #[test]
    fn key_debug_is_redacted() {
        assert_eq!(format!("{:?}", key(b'a')), "SigningKey(<32 bytes redacted>)");
    }

    #[tokio::test]
    async fn issue_then_validate_round_trips_identity_and_roles() {
        let (_lookup, svc) = seeded();
        let now = Utc::now();

        let issued = svc.issue(&doctor(), now).unwrap();
        assert_eq!(issued.claims.expires_at, now + Duration::hours(1));

        let principal = svc.validate(&issued.token, now).await.unwrap();
        assert_eq!(principal.identity(), "doc@x.com");
        assert_eq!(principal.roles(), &[Role::DOCTOR]);
    }

    #[tokio::test]
    async fn expired_token_fails_with_expired() {
        let (_lookup, svc) = seeded();
        let now = Utc::now();
        let issued = svc.issue(&doctor(), now).unwrap();

        let at_expiry = issued.claims.expires_at;
        assert_eq!(svc.validate(&issued.token, at_expiry).await, Err(TokenFailure::Expired));
        assert_eq!(
            svc.validate(&issued.token, at_expiry + Duration::minutes(5)).await,
            Err(TokenFailure::Expired)
        );
    }

    #[tokio::test]
    async fn altered_signature_fails_with_signature_invalid() {
        let (_lookup, svc) = seeded();
        let issued = svc.issue(&doctor(), Utc::now()).unwrap();

        // Flip a character in the middle of the signature segment (the last
        // character only carries padding bits and may not change the bytes).
        let sig_start = issued.token.rfind('.').unwrap() + 1;
        let target = sig_start + 10;
        let mut bytes = issued.token.clone().into_bytes();
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(svc.validate(&tampered, Utc::now()).await, Err(TokenFailure::SignatureInvalid));
    }

    #[tokio::test]
    async fn token_from_another_key_fails_with_signature_invalid() {
        let (lookup, svc) = seeded();
        let foreign = TokenService::new(&key(9), Duration::hours(1), lookup);
        let issued = foreign.issue(&doctor(), Utc::now()).unwrap();

        assert_eq!(svc.validate(&issued.token, Utc::now()).await, Err(TokenFailure::SignatureInvalid));
    }

    #[tokio::test]
    async fn other_algorithms_are_refused() {
        let (_lookup, svc) = seeded();
        let now = Utc::now();
        let claims = JwtClaims {
            sub: "doc@x.com".into(),
            roles: vec![Role::DOCTOR],
            issued_at: now,
            expires_at: now + Duration::hours(1),
        };
        let hs512 = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&[7u8; 32]),
        )
        .unwrap();
        assert_eq!(svc.validate(&hs512, now).await, Err(TokenFailure::SignatureInvalid));

        // {"alg":"none","typ":"JWT"} with an empty signature.
        let payload = hs512.split('.').nth(1).unwrap();
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{payload}.");
        assert!(svc.validate(&unsigned, now).await.is_err());
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let (_lookup, svc) = seeded();
        for token in ["", "abc", "a.b", "a.b.c", "....."] {
            assert_eq!(svc.validate(token, Utc::now()).await, Err(TokenFailure::Malformed), "{token:?}");
        }
    }

    #[tokio::test]
    async fn removed_subject_fails_with_unknown_subject() {
        let (lookup, svc) = seeded();
        let issued = svc.issue(&doctor(), Utc::now()).unwrap();

        lookup.remove("doc@x.com");
        assert_eq!(svc.validate(&issued.token, Utc::now()).await, Err(TokenFailure::UnknownSubject));
    }

    #[tokio::test]
    async fn disabled_subject_is_refused() {
        let (lookup, svc) = seeded();
        let issued = svc.issue(&doctor(), Utc::now()).unwrap();

        lookup.put(doctor().with_enabled(false));
        assert_eq!(svc.validate(&issued.token, Utc::now()).await, Err(TokenFailure::SubjectDisabled));
    }

    #[tokio::test]
    async fn roles_come_from_the_store_not_the_token() {
        let (lookup, svc) = seeded();
        let issued = svc.issue(&doctor(), Utc::now()).unwrap();

        lookup.put(Principal::new("doc@x.com", SecretHash::from_phc("x"), [Role::PATIENT]));
        let principal = svc.validate(&issued.token, Utc::now()).await.unwrap();
        assert_eq!(principal.roles(), &[Role::PATIENT]);
        assert_eq!(issued.claims.roles, vec![Role::DOCTOR]);
    }
}
