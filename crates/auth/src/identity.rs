//! Identity Lookup capability.
//!
//! The auth layer never talks to a database directly; it resolves identities
//! through this trait so the backing store can be swapped (in-memory for
//! dev/tests, Postgres in production).

use std::sync::Arc;

use async_trait::async_trait;

use crate::{LookupError, Principal};

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Resolve an identity string to its principal.
    ///
    /// `Ok(None)` means "no such identity"; `Err` means the store could not
    /// answer. Implementations must be safe under concurrent calls.
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, LookupError>;
}

#[async_trait]
impl<T> IdentityLookup for Arc<T>
where
    T: IdentityLookup + ?Sized,
{
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Principal>, LookupError> {
        (**self).find_by_identity(identity).await
    }
}
