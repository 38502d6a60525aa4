use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use medibook_auth::{Principal, Role, SecretHash};
use medibook_core::{Email, UserId};

/// A user ready to be persisted (no id assigned yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: Email,
    pub password_hash: SecretHash,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub specialty: Option<String>,
    pub photo: Option<String>,
    pub roles: Vec<Role>,
}

/// A persisted user.
///
/// Serializing a record never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    pub email: Email,
    #[serde(skip)]
    pub password_hash: SecretHash,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub specialty: Option<String>,
    pub photo: Option<String>,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn from_new(id: UserId, user: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            firstname: user.firstname,
            lastname: user.lastname,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            sex: user.sex,
            specialty: user.specialty,
            photo: user.photo,
            roles: user.roles,
            created_at,
        }
    }

    /// Authentication view of this user. No suspension lifecycle exists, so
    /// every stored user is an enabled, unlocked principal.
    pub fn principal(&self) -> Principal {
        Principal::new(self.email.as_str(), self.password_hash.clone(), self.roles.iter().cloned())
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Specialty {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Email uniqueness violated.
    #[error("email already in use")]
    EmailInUse,

    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user. Fails with `EmailInUse` if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Users holding `role`, oldest first.
    async fn list_by_role(&self, role: &Role) -> Result<Vec<UserRecord>, StoreError>;

    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        (**self).insert(user).await
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn list_by_role(&self, role: &Role) -> Result<Vec<UserRecord>, StoreError> {
        (**self).list_by_role(role).await
    }

    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError> {
        (**self).list_specialties().await
    }
}
