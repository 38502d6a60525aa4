use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use medibook_auth::Role;
use medibook_core::{Email, UserId};

use super::r#trait::{NewUser, Specialty, StoreError, UserRecord, UserStore};

const DEFAULT_SPECIALTIES: &[&str] = &[
    "Cardiology",
    "Dermatology",
    "General Medicine",
    "Gynecology",
    "Neurology",
    "Ophthalmology",
    "Pediatrics",
    "Traumatology",
];

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<Email, UserId>,
}

/// In-memory user store.
///
/// Intended for tests/dev. Email uniqueness is enforced under the write lock.
#[derive(Debug)]
pub struct InMemoryUserStore {
    inner: RwLock<Tables>,
    specialties: Vec<Specialty>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::with_specialties(DEFAULT_SPECIALTIES.iter().copied())
    }

    pub fn with_specialties<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let specialties = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Specialty {
                id: i as i32 + 1,
                name: name.to_string(),
            })
            .collect();

        Self {
            inner: RwLock::new(Tables::default()),
            specialties,
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("in-memory user store lock poisoned".to_string())
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        if tables.by_email.contains_key(&user.email) {
            return Err(StoreError::EmailInUse);
        }

        let record = UserRecord::from_new(UserId::new(), user, Utc::now());
        tables.by_email.insert(record.email.clone(), record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn list_by_role(&self, role: &Role) -> Result<Vec<UserRecord>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut users: Vec<UserRecord> = tables
            .users
            .values()
            .filter(|u| u.has_role(role))
            .cloned()
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn list_specialties(&self) -> Result<Vec<Specialty>, StoreError> {
        Ok(self.specialties.clone())
    }
}

#[cfg(test)]
mod tests {
    use medibook_auth::SecretHash;

    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            firstname: "Gregory".into(),
            lastname: "House".into(),
            email: Email::parse(email).unwrap(),
            password_hash: SecretHash::from_phc("$argon2id$stub"),
            phone: None,
            sex: None,
            specialty: None,
            photo: None,
            roles: vec![role],
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_email_and_id() {
        let store = InMemoryUserStore::new();
        let created = store.insert(new_user("doc@x.com", Role::DOCTOR)).await.unwrap();

        let by_email = store.find_by_email(&Email::parse("DOC@x.com").unwrap()).await.unwrap();
        assert_eq!(by_email.as_ref(), Some(&created));
        assert_eq!(store.find_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(store.find_by_id(UserId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("doc@x.com", Role::DOCTOR)).await.unwrap();

        let err = store.insert(new_user("Doc@X.com", Role::PATIENT)).await.unwrap_err();
        assert_eq!(err, StoreError::EmailInUse);
    }

    #[tokio::test]
    async fn list_by_role_filters() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("doc1@x.com", Role::DOCTOR)).await.unwrap();
        store.insert(new_user("pat@x.com", Role::PATIENT)).await.unwrap();
        store.insert(new_user("doc2@x.com", Role::DOCTOR)).await.unwrap();

        let doctors = store.list_by_role(&Role::DOCTOR).await.unwrap();
        let emails: Vec<&str> = doctors.iter().map(|d| d.email.as_str()).collect();
        assert_eq!(emails.len(), 2);
        assert!(emails.contains(&"doc1@x.com") && emails.contains(&"doc2@x.com"));
    }

    #[tokio::test]
    async fn specialties_are_numbered_from_one() {
        let store = InMemoryUserStore::with_specialties(["Cardiology", "Pediatrics"]);
        let specialties = store.list_specialties().await.unwrap();
        assert_eq!(specialties[0], Specialty { id: 1, name: "Cardiology".into() });
        assert_eq!(specialties[1].id, 2);
    }
}
