//! Infrastructure layer: principal storage and its adapters.

pub mod identity;
pub mod users;

pub use identity::StoreIdentityLookup;
pub use users::{InMemoryUserStore, NewUser, Specialty, StoreError, UserRecord, UserStore};
#[cfg(feature = "postgres")]
pub use users::PostgresUserStore;
