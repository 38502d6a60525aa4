//! Salted, slow secret hashing (Argon2id, PHC string format).

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};

use crate::{PasswordHashError, SecretHash};

#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl SecretHasher {
    /// Memory cost (KiB) used by [`SecretHasher::new`].
    pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
    /// Iteration count used by [`SecretHasher::new`].
    pub const DEFAULT_ITERATIONS: u32 = Params::DEFAULT_T_COST;

    /// Argon2id with the crate's default cost parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit memory (KiB) and iteration cost.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, PasswordHashError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| PasswordHashError(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, secret: &str) -> Result<SecretHash, PasswordHashError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| PasswordHashError(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordHashError(e.to_string()))?;
        let phc = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PasswordHashError(e.to_string()))?
            .to_string();
        Ok(SecretHash::from_phc(phc))
    }

    /// Constant-time comparison of `secret` against a stored hash.
    ///
    /// Cost parameters are read from the PHC string, so hashes produced with a
    /// different cost still verify. An unparseable hash never matches.
    pub fn verify(&self, secret: &str, hash: &SecretHash) -> bool {
        match PasswordHash::new(hash.as_phc()) {
            Ok(parsed) => self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecretHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> SecretHasher {
        SecretHasher::with_cost(8, 1).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = cheap();
        let hash = hasher.hash("pw123").unwrap();
        assert!(hash.as_phc().starts_with("$argon2id$"));
        assert!(hasher.verify("pw123", &hash));
        assert!(!hasher.verify("pw124", &hash));
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        let hasher = cheap();
        let a = hasher.hash("pw123").unwrap();
        let b = hasher.hash("pw123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!cheap().verify("pw123", &SecretHash::from_phc("not-a-phc-string")));
        assert!(!cheap().verify("", &SecretHash::from_phc("")));
    }

    #[test]
    fn default_cost_constants_describe_new() {
        let hash = SecretHasher::new().hash("pw123").unwrap();
        let expected = format!(
            "m={},t={}",
            SecretHasher::DEFAULT_MEMORY_KIB,
            SecretHasher::DEFAULT_ITERATIONS
        );
        assert!(hash.as_phc().contains(&expected));
    }

    #[test]
    fn rejects_impossible_cost() {
        assert!(SecretHasher::with_cost(0, 0).is_err());
    }
}
