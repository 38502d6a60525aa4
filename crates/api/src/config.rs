//! Process configuration, read once at startup from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use medibook_auth::{SecretHasher, SigningKey, SigningKeyError};
use medibook_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_SECS: i64 = 10 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("JWT_SECRET rejected: {0}")]
    SigningKey(#[from] SigningKeyError),
}

/// Argon2 cost override.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    #[cfg(feature = "postgres")]
    Postgres { database_url: String },
}

/// Administrator account created at startup when absent.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub signing_key: SigningKey,
    pub token_ttl: Duration,
    pub hash_cost: Option<HashCost>,
    pub store: StoreBackend,
    pub admin: Option<AdminBootstrap>,
    pub log_format: LogFormat,
    /// Notices raised while reading the environment, logged by the caller
    /// once tracing is initialized.
    pub warnings: Vec<String>,
}

impl ApiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        let mut warnings = Vec::new();

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let signing_key = match var("JWT_SECRET") {
            Some(secret) => SigningKey::from_bytes(secret.into_bytes())?,
            None => {
                warnings.push("JWT_SECRET not set; using a random key (tokens will not survive a restart)".to_string());
                SigningKey::generate()?
            }
        };

        let ttl_secs = match var("TOKEN_TTL_SECS") {
            Some(raw) => raw.parse::<i64>().map_err(|e| invalid("TOKEN_TTL_SECS", e))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if ttl_secs <= 0 {
            return Err(invalid("TOKEN_TTL_SECS", "must be positive"));
        }
        let token_ttl = Duration::try_seconds(ttl_secs).ok_or_else(|| invalid("TOKEN_TTL_SECS", "out of range"))?;

        let hash_cost = match (var("PASSWORD_HASH_MEMORY_KIB"), var("PASSWORD_HASH_ITERATIONS")) {
            (None, None) => None,
            (memory, iterations) => Some(HashCost {
                memory_kib: parse_or(memory, "PASSWORD_HASH_MEMORY_KIB", SecretHasher::DEFAULT_MEMORY_KIB)?,
                iterations: parse_or(iterations, "PASSWORD_HASH_ITERATIONS", SecretHasher::DEFAULT_ITERATIONS)?,
            }),
        };

        let store = store_backend(&var, &mut warnings)?;

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| invalid("LOG_FORMAT", "expected json or pretty"))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            signing_key,
            token_ttl,
            hash_cost,
            store,
            admin,
            log_format,
            warnings,
        })
    }
}

#[cfg(feature = "postgres")]
fn store_backend(var: &impl Fn(&str) -> Option<String>, _warnings: &mut Vec<String>) -> Result<StoreBackend, ConfigError> {
    let persistent = var("USE_PERSISTENT_STORES")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !persistent {
        return Ok(StoreBackend::InMemory);
    }
    let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
    Ok(StoreBackend::Postgres { database_url })
}

#[cfg(not(feature = "postgres"))]
fn store_backend(var: &impl Fn(&str) -> Option<String>, warnings: &mut Vec<String>) -> Result<StoreBackend, ConfigError> {
    if var("USE_PERSISTENT_STORES").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        warnings.push("USE_PERSISTENT_STORES=true ignored: built without the `postgres` feature".to_string());
    }
    Ok(StoreBackend::InMemory)
}

fn parse_or(raw: Option<String>, name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match raw {
        Some(raw) => raw.parse::<u32>().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
