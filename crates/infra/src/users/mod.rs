//! User (principal) storage.
//!
//! The store is an external collaborator of the auth layer: it persists users
//! and their roles, and is read by `StoreIdentityLookup` on every login and
//! every authenticated request.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryUserStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserStore;
pub use r#trait::{NewUser, Specialty, StoreError, UserRecord, UserStore};
