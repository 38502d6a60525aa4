//! Service wiring: user store, credential verifier and token service.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use medibook_auth::{
    AuthFailure, CredentialVerifier, IdentityLookup, IssuedToken, PasswordHashError, Role, SecretHash, SecretHasher,
    TokenIssueError, TokenService,
};
use medibook_core::Email;
use medibook_infra::{InMemoryUserStore, NewUser, StoreError, StoreIdentityLookup, UserRecord, UserStore};

use crate::app::dto::ValidRegistration;
use crate::config::{AdminBootstrap, ApiConfig, StoreBackend};

pub type SharedLookup = Arc<dyn IdentityLookup>;

pub struct AppServices {
    pub store: Arc<dyn UserStore>,
    pub verifier: CredentialVerifier<SharedLookup>,
    pub tokens: Arc<TokenService<SharedLookup>>,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error(transparent)]
    Issue(#[from] TokenIssueError),
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] PasswordHashError),
}

/// Optional profile fields beyond the shared registration set.
#[derive(Debug, Clone, Default)]
pub struct ProfileExtras {
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub specialty: Option<String>,
    pub photo: Option<String>,
}

impl AppServices {
    pub fn new(config: &ApiConfig, store: Arc<dyn UserStore>) -> Result<Self, PasswordHashError> {
        let hasher = match config.hash_cost {
            Some(cost) => SecretHasher::with_cost(cost.memory_kib, cost.iterations)?,
            None => SecretHasher::new(),
        };

        let lookup: SharedLookup = Arc::new(StoreIdentityLookup::new(store.clone()));
        let verifier = CredentialVerifier::new(lookup.clone(), hasher)?;
        let tokens = Arc::new(TokenService::new(&config.signing_key, config.token_ttl, lookup));

        Ok(Self { store, verifier, tokens })
    }

    /// Verify credentials and mint a bearer token for the resolved principal.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, LoginError> {
        let principal = self.verifier.verify(email, password).await?;
        let issued = self.tokens.issue(&principal, Utc::now())?;
        info!(roles = ?principal.roles(), "login succeeded");
        Ok(issued)
    }

    pub async fn register(
        &self,
        registration: ValidRegistration,
        extras: ProfileExtras,
        role: Role,
    ) -> Result<UserRecord, RegistrationError> {
        let password_hash = self.hash_secret(registration.password).await?;

        let record = self
            .store
            .insert(NewUser {
                firstname: registration.firstname,
                lastname: registration.lastname,
                email: registration.email,
                password_hash,
                phone: extras.phone,
                sex: extras.sex,
                specialty: extras.specialty,
                photo: extras.photo,
                roles: vec![role],
            })
            .await?;

        info!(user_id = %record.id, roles = ?record.roles, "user registered");
        Ok(record)
    }

    /// Create the configured administrator unless the email is already taken.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> anyhow::Result<()> {
        let email = Email::parse(&admin.email)?;
        if self.store.find_by_email(&email).await?.is_some() {
            info!(email = %email, "bootstrap administrator already present");
            return Ok(());
        }

        let registration = ValidRegistration {
            firstname: "Administrator".to_string(),
            lastname: "Account".to_string(),
            email,
            password: admin.password.clone(),
        };
        match self.register(registration, ProfileExtras::default(), Role::ADMIN).await {
            // Another replica won the race.
            Ok(_) | Err(RegistrationError::Store(StoreError::EmailInUse)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // Hashing is CPU-bound; run it on the blocking pool.
    async fn hash_secret(&self, secret: String) -> Result<SecretHash, PasswordHashError> {
        let hasher = self.verifier.hasher().clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| PasswordHashError(format!("hashing task failed: {e}")))?
    }
}

/// Build the configured user store.
pub async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match &config.store {
        StoreBackend::InMemory => {
            info!("using in-memory user store");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres { database_url } => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let store = medibook_infra::PostgresUserStore::new(pool);
            store.migrate().await?;
            info!("using postgres user store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use medibook_auth::SigningKey;
    use medibook_observability::LogFormat;

    use super::*;
    use crate::config::HashCost;

    fn config() -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            signing_key: SigningKey::from_bytes(vec![7u8; 32]).unwrap(),
            token_ttl: chrono::Duration::minutes(5),
            hash_cost: Some(HashCost {
                memory_kib: 8,
                iterations: 1,
            }),
            store: StoreBackend::InMemory,
            admin: None,
            log_format: LogFormat::Pretty,
            warnings: Vec::new(),
        }
    }

    fn services() -> AppServices {
        AppServices::new(&config(), Arc::new(InMemoryUserStore::new())).unwrap()
    }

    fn registration(email: &str) -> ValidRegistration {
        ValidRegistration {
            firstname: "Maria".into(),
            lastname: "Lopez".into(),
            email: Email::parse(email).unwrap(),
            password: "s3cret".into(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn registered_user_can_log_in() {
        let svc = services();
        svc.register(registration("maria@clinic.org"), ProfileExtras::default(), Role::PATIENT)
            .await
            .unwrap();

        let issued = svc.login("maria@clinic.org", "s3cret").await.unwrap();
        assert_eq!(issued.claims.sub, "maria@clinic.org");
        assert_eq!(issued.claims.roles, vec![Role::PATIENT]);

        let err = svc.login("maria@clinic.org", "wrong").await.unwrap_err();
        assert!(matches!(err, LoginError::Auth(AuthFailure::InvalidCredentials)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_registration_is_email_in_use() {
        let svc = services();
        svc.register(registration("maria@clinic.org"), ProfileExtras::default(), Role::PATIENT)
            .await
            .unwrap();
        let err = svc
            .register(registration("MARIA@clinic.org"), ProfileExtras::default(), Role::PATIENT)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Store(StoreError::EmailInUse)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bootstrap_admin_is_idempotent() {
        let svc = services();
        let admin = AdminBootstrap {
            email: "root@clinic.org".into(),
            password: "hunter22".into(),
        };
        svc.bootstrap_admin(&admin).await.unwrap();
        svc.bootstrap_admin(&admin).await.unwrap();

        let admins = svc.store.list_by_role(&Role::ADMIN).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert!(svc.login("root@clinic.org", "hunter22").await.is_ok());
    }
}
