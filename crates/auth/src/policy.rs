//! Authorization Policy: ordered (method, path pattern) → access rules.
//!
//! Patterns are Ant-style:
//! - literal segments match exactly (`/api/doctors`)
//! - `*` matches exactly one segment (`/api/doctors/uploads/img/*`)
//! - a trailing `**` matches zero or more segments (`/api/**`)
//!
//! Wildcards never match `.` or `..` segments. Empty segments are ignored, so
//! `/api/doctors/` and `/api/doctors` are the same path.
//!
//! Rules are checked in insertion order and the first match wins. A request no
//! rule matches requires an authenticated principal.

use serde::Serialize;
use thiserror::Error;

use crate::Role;

/// What a matching rule demands from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", content = "role", rename_all = "snake_case")]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("path pattern must start with '/': {0}")]
    NotAbsolute(String),

    #[error("'**' is only allowed as the last segment: {0}")]
    MisplacedRest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    One,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        if !raw.starts_with('/') {
            return Err(PolicyError::NotAbsolute(raw.to_string()));
        }

        let parts: Vec<&str> = split_path(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if i + 1 == parts.len() => Segment::Rest,
                "**" => return Err(PolicyError::MisplacedRest(raw.to_string())),
                "*" => Segment::One,
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut path = split_path(path);

        for segment in &self.segments {
            match segment {
                Segment::Rest => return path.all(|s| !is_dot_segment(s)),
                Segment::One => match path.next() {
                    Some(s) if !is_dot_segment(s) => {}
                    _ => return false,
                },
                Segment::Literal(lit) => match path.next() {
                    Some(s) if s == lit => {}
                    _ => return false,
                },
            }
        }

        path.next().is_none()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn is_dot_segment(s: &str) -> bool {
    s == "." || s == ".."
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Uppercase HTTP method, or `None` for any method.
    method: Option<String>,
    pattern: PathPattern,
    access: Access,
}

impl Rule {
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    fn matches(&self, method: &str, path: &str) -> bool {
        let method_ok = match &self.method {
            Some(m) => m.eq_ignore_ascii_case(method),
            None => true,
        };
        method_ok && self.pattern.matches(path)
    }
}

/// Immutable, ordered rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    rules: Vec<Rule>,
}

static DEFAULT_ACCESS: Access = Access::Authenticated;

impl AuthorizationPolicy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Access level demanded for `(method, path)`. Pure and deterministic.
    pub fn access_for(&self, method: &str, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|r| r.matches(method, path))
            .map(Rule::access)
            .unwrap_or(&DEFAULT_ACCESS)
    }
}

#[derive(Debug, Default)]
pub struct PolicyBuilder {
    pending: Vec<(Option<String>, String, Access)>,
}

impl PolicyBuilder {
    pub fn rule(mut self, method: Option<&str>, pattern: &str, access: Access) -> Self {
        self.pending
            .push((method.map(str::to_ascii_uppercase), pattern.to_string(), access));
        self
    }

    pub fn permit(self, method: &str, pattern: &str) -> Self {
        self.rule(Some(method), pattern, Access::Public)
    }

    pub fn permit_any_method(self, pattern: &str) -> Self {
        self.rule(None, pattern, Access::Public)
    }

    pub fn authenticated(self, method: &str, pattern: &str) -> Self {
        self.rule(Some(method), pattern, Access::Authenticated)
    }

    pub fn require_role(self, method: &str, pattern: &str, role: Role) -> Self {
        self.rule(Some(method), pattern, Access::Role(role))
    }

    /// Cross-origin preflight requests never carry credentials.
    pub fn permit_preflight(self) -> Self {
        self.permit("OPTIONS", "/**")
    }

    pub fn build(self) -> Result<AuthorizationPolicy, PolicyError> {
        let rules = self
            .pending
            .into_iter()
            .map(|(method, pattern, access)| {
                Ok(Rule {
                    method,
                    pattern: PathPattern::parse(&pattern)?,
                    access,
                })
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;
        Ok(AuthorizationPolicy { rules })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let p = pattern("/api/doctors");
        assert!(p.matches("/api/doctors"));
        assert!(p.matches("/api/doctors/"));
        assert!(p.matches("//api//doctors"));
        assert!(!p.matches("/api/doctors/1"));
        assert!(!p.matches("/api"));
        assert!(!p.matches("/API/doctors"));
    }

    #[test]
    fn single_wildcard_matches_one_segment() {
        let p = pattern("/api/doctors/uploads/img/*");
        assert!(p.matches("/api/doctors/uploads/img/a.png"));
        assert!(!p.matches("/api/doctors/uploads/img"));
        assert!(!p.matches("/api/doctors/uploads/img/a/b.png"));
        assert!(!p.matches("/api/doctors/uploads/img/.."));
    }

    #[test]
    fn rest_wildcard_matches_zero_or_more_segments() {
        let p = pattern("/auth/**");
        assert!(p.matches("/auth"));
        assert!(p.matches("/auth/login"));
        assert!(p.matches("/auth/a/b/c"));
        assert!(!p.matches("/authx"));
        assert!(!p.matches("/auth/../admin"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert_eq!(PathPattern::parse("api"), Err(PolicyError::NotAbsolute("api".into())));
        assert_eq!(
            PathPattern::parse("/**/admin"),
            Err(PolicyError::MisplacedRest("/**/admin".into()))
        );
        assert!(AuthorizationPolicy::builder().permit("GET", "nope").build().is_err());
    }

    #[test]
    fn first_matching_rule_wins_and_default_is_authenticated() {
        let policy = AuthorizationPolicy::builder()
            .require_role("POST", "/api/doctors", Role::ADMIN)
            .permit("GET", "/api/doctors")
            .permit_any_method("/api/**")
            .build()
            .unwrap();

        assert_eq!(policy.access_for("POST", "/api/doctors"), &Access::Role(Role::ADMIN));
        assert_eq!(policy.access_for("get", "/api/doctors"), &Access::Public);
        assert_eq!(policy.access_for("DELETE", "/api/doctors"), &Access::Public);
        assert_eq!(policy.access_for("GET", "/whoami"), &Access::Authenticated);
    }

    #[test]
    fn preflight_is_public_everywhere() {
        let policy = AuthorizationPolicy::builder().permit_preflight().build().unwrap();
        assert_eq!(policy.access_for("OPTIONS", "/auth/user_actual"), &Access::Public);
        assert_eq!(policy.access_for("GET", "/auth/user_actual"), &Access::Authenticated);
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_]{1,8}"
    }

    proptest! {
        #[test]
        fn empty_policy_always_requires_authentication(
            method in "[A-Z]{3,7}",
            segs in prop::collection::vec(segment(), 0..6),
        ) {
            let policy = AuthorizationPolicy::builder().build().unwrap();
            let path = format!("/{}", segs.join("/"));
            prop_assert_eq!(policy.access_for(&method, &path), &Access::Authenticated);
        }

        #[test]
        fn rest_pattern_matches_every_extension_of_its_prefix(
            prefix in prop::collection::vec(segment(), 1..4),
            tail in prop::collection::vec(segment(), 0..4),
        ) {
            let p = PathPattern::parse(&format!("/{}/**", prefix.join("/"))).unwrap();
            let mut all = prefix.clone();
            all.extend(tail);
            let path = format!("/{}", all.join("/"));
            prop_assert!(p.matches(&path));
        }

        #[test]
        fn literal_pattern_matches_only_itself(
            a in prop::collection::vec(segment(), 1..5),
            b in prop::collection::vec(segment(), 1..5),
        ) {
            let p = PathPattern::parse(&format!("/{}", a.join("/"))).unwrap();
            prop_assert_eq!(p.matches(&format!("/{}", b.join("/"))), a == b);
        }

        #[test]
        fn evaluation_is_deterministic(
            segs in prop::collection::vec(segment(), 0..5),
        ) {
            let policy = AuthorizationPolicy::builder()
                .permit("GET", "/api/*")
                .require_role("GET", "/api/**", Role::DOCTOR)
                .build()
                .unwrap();
            let path = format!("/{}", segs.join("/"));
            let first = policy.access_for("GET", &path).clone();
            prop_assert_eq!(policy.access_for("GET", &path), &first);
        }
    }
}
