//! Identity Lookup backed by a `UserStore`.

use async_trait::async_trait;
use tracing::warn;

use medibook_auth::{IdentityLookup, LookupError, Principal};
use medibook_core::Email;

use crate::users::{StoreError, UserStore};

/// Resolves login identities (emails) through any `UserStore`.
///
/// Identities that are not syntactically valid emails cannot exist in the
/// store and resolve to `None` without a round trip.
#[derive(Debug, Clone)]
pub struct StoreIdentityLookup<S> {
    store: S,
}

impl<S> StoreIdentityLookup<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> IdentityLookup for StoreIdentityLookup<S>
where
    S: UserStore,
{
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, LookupError> {
        let Ok(email) = Email::parse(identity) else {
            return Ok(None);
        };

        match self.store.find_by_email(&email).await {
            Ok(record) => Ok(record.map(|r| r.principal())),
            Err(StoreError::EmailInUse) => Ok(None),
            Err(StoreError::Backend(msg)) => {
                warn!(error = %msg, "identity lookup failed");
                Err(LookupError::Unavailable(msg))
            }
        }
    }
}
