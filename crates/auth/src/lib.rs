//! Authentication and authorization for MediBook.
//!
//! Credential verification, bearer token issuance/validation, identity lookup
//! and the route authorization policy. No HTTP or storage types appear here.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, validate_claims};
pub use credentials::CredentialVerifier;
pub use error::{AuthFailure, LookupError, PasswordHashError, TokenFailure, TokenIssueError};
pub use identity::IdentityLookup;
pub use password::SecretHasher;
pub use policy::{Access, AuthorizationPolicy, PathPattern, PolicyBuilder, PolicyError, Rule};
pub use principal::{Principal, SecretHash};
pub use roles::Role;
pub use token::{IssuedToken, SigningKey, SigningKeyError, TokenService, TokenValidator};
