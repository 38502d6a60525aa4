use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medibook_core::{Email, UserId};
use medibook_infra::UserRecord;

const NAME_MIN: usize = 4;
const NAME_MAX: usize = 30;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDoctorRequest {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
    pub sex: Option<String>,
    pub specialty: Option<String>,
    pub photo: Option<String>,
}

/// Fields every registration shares, after validation.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub firstname: String,
    pub lastname: String,
    pub email: Email,
    pub password: String,
}

impl RegisterPatientRequest {
    pub fn validate(&self) -> Result<ValidRegistration, Vec<String>> {
        validate_registration(&self.firstname, &self.lastname, &self.email, &self.password)
    }
}

impl RegisterDoctorRequest {
    pub fn validate(&self) -> Result<ValidRegistration, Vec<String>> {
        let mut errors = match validate_registration(&self.firstname, &self.lastname, &self.email, &self.password) {
            Ok(valid) => return validate_optional_fields(self).map(|()| valid),
            Err(errors) => errors,
        };
        if let Err(more) = validate_optional_fields(self) {
            errors.extend(more);
        }
        Err(errors)
    }
}

fn validate_optional_fields(req: &RegisterDoctorRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if req.specialty.as_deref().is_some_and(|s| s.trim().is_empty()) {
        errors.push("specialty must not be blank".to_string());
    }
    if req.phone.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.push("phone must not be blank".to_string());
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Collects every violation rather than stopping at the first.
fn validate_registration(
    firstname: &str,
    lastname: &str,
    email: &str,
    password: &str,
) -> Result<ValidRegistration, Vec<String>> {
    let mut errors = Vec::new();

    check_name("firstname", firstname, &mut errors);
    check_name("lastname", lastname, &mut errors);

    let email = if email.trim().is_empty() {
        errors.push("email is required".to_string());
        None
    } else {
        match Email::parse(email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.push("email is invalid".to_string());
                None
            }
        }
    };

    if password.is_empty() {
        errors.push("password is required".to_string());
    }

    match email {
        Some(email) if errors.is_empty() => Ok(ValidRegistration {
            firstname: firstname.trim().to_string(),
            lastname: lastname.trim().to_string(),
            email,
            password: password.to_string(),
        }),
        _ => Err(errors),
    }
}

fn check_name(field: &str, value: &str, errors: &mut Vec<String>) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(format!("{field} is required"));
    } else if !(NAME_MIN..=NAME_MAX).contains(&len) {
        errors.push(format!("{field} must be between {NAME_MIN} and {NAME_MAX} characters"));
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub roles: Vec<String>,
}

impl From<UserRecord> for UserProfile {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            firstname: r.firstname,
            lastname: r.lastname,
            email: r.email,
            phone: r.phone,
            sex: r.sex,
            specialty: r.specialty,
            photo: r.photo,
            roles: r.roles.iter().map(|role| role.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub identity: String,
    pub authorities: Vec<String>,
}
