//! Credential Verifier: identity + secret → principal.

use tokio::task::JoinError;
use tracing::{debug, error};

use crate::{AuthFailure, IdentityLookup, PasswordHashError, Principal, SecretHash, SecretHasher};

/// Checks submitted credentials against the principal store.
///
/// Unknown identities are verified against a decoy hash so both failure paths
/// cost one hash computation and return the same error.
pub struct CredentialVerifier<L> {
    lookup: L,
    hasher: SecretHasher,
    decoy: SecretHash,
}

impl<L> CredentialVerifier<L>
where
    L: IdentityLookup,
{
    pub fn new(lookup: L, hasher: SecretHasher) -> Result<Self, PasswordHashError> {
        let decoy = hasher.hash("decoy-secret-for-unknown-identities")?;
        Ok(Self { lookup, hasher, decoy })
    }

    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    pub async fn verify(&self, identity: &str, secret: &str) -> Result<Principal, AuthFailure> {
        let principal = self.lookup.find_by_identity(identity).await?;

        let stored = match &principal {
            Some(p) => p.secret_hash().clone(),
            None => self.decoy.clone(),
        };
        let matches = self.check_secret(secret, stored).await;

        let principal = match principal {
            Some(p) if matches => p,
            _ => {
                debug!(reason = "invalid_credentials", "credential verification failed");
                return Err(AuthFailure::InvalidCredentials);
            }
        };

        if !principal.is_active() {
            debug!(reason = "account_disabled", "credential verification failed");
            return Err(AuthFailure::AccountDisabled);
        }

        Ok(principal)
    }

    // Argon2 is deliberately slow; keep it off the async worker threads.
    async fn check_secret(&self, secret: &str, stored: SecretHash) -> bool {
        let hasher = self.hasher.clone();
        let secret = secret.to_owned();
        secret_matched(tokio::task::spawn_blocking(move || hasher.verify(&secret, &stored)).await)
    }
}

/// A hashing task that panicked or was cancelled counts as a mismatch.
fn secret_matched(outcome: Result<bool, JoinError>) -> bool {
    match outcome {
        Ok(matches) => matches,
        Err(e) => {
            error!(error = %e, "secret verification task failed");
            false
        }
    }
}
