use serde::Serialize;

use crate::Role;

/// Stored secret hash (PHC string). Never serialized, redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// An identity that can authenticate, together with its granted roles.
///
/// The identity string is the login email and the token subject. Account
/// flags exist so the checks are in place, but registration always creates
/// enabled, unlocked principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    identity: String,
    #[serde(skip)]
    secret_hash: SecretHash,
    roles: Vec<Role>,
    enabled: bool,
    locked: bool,
}

impl Principal {
    pub fn new(identity: impl Into<String>, secret_hash: SecretHash, roles: impl IntoIterator<Item = Role>) -> Self {
        let mut deduped: Vec<Role> = Vec::new();
        for role in roles {
            if !deduped.contains(&role) {
                deduped.push(role);
            }
        }

        Self {
            identity: identity.into(),
            secret_hash,
            roles: deduped,
            enabled: true,
            locked: false,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret_hash(&self) -> &SecretHash {
        &self.secret_hash
    }

    /// Granted authorities (one per role).
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Enabled and not locked.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_deduplicated_in_order() {
        let p = Principal::new(
            "doc@x.com",
            SecretHash::from_phc("$argon2id$stub"),
            [Role::DOCTOR, Role::ADMIN, Role::DOCTOR],
        );
        assert_eq!(p.roles(), &[Role::DOCTOR, Role::ADMIN]);
        assert!(p.is_active());
    }

    #[test]
    fn hash_never_leaks_through_debug_or_json() {
        let p = Principal::new("doc@x.com", SecretHash::from_phc("$argon2id$secret-material"), [Role::DOCTOR]);
        assert!(!format!("{p:?}").contains("secret-material"));

        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("secret_hash").is_none());
        assert_eq!(json["identity"], "doc@x.com");
    }

    #[test]
    fn locked_principal_is_not_active() {
        let p = Principal::new("a@b.co", SecretHash::from_phc("x"), [Role::PATIENT]).with_locked(true);
        assert!(p.is_enabled());
        assert!(!p.is_active());
    }
}
