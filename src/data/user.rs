//! User accounts and their validation rules.

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::ValidateEmail;

use crate::data::validator::Validator;

/// A registered account.
///
/// Like movies, users carry a version that guards concurrent edits
/// (activation in particular).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: Password,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: Password) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            name: name.into(),
            email: email.into(),
            password,
            activated: false,
            version: 0,
        }
    }
}

/// A bcrypt password hash. The plaintext is never stored.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}

impl Password {
    /// Hashes `plaintext` with the given bcrypt cost.
    ///
    /// CPU bound; call from a blocking context.
    pub fn hash(plaintext: &str, cost: u32) -> Result<Self, bcrypt::BcryptError> {
        Ok(Self {
            hash: bcrypt::hash(plaintext, cost)?,
        })
    }

    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Compares `plaintext` against the stored hash.
    pub fn matches(&self, plaintext: &str) -> Result<bool, bcrypt::BcryptError> {
        bcrypt::verify(plaintext, &self.hash)
    }
}

pub const MAX_NAME_BYTES: usize = 500;
pub const MIN_PASSWORD_BYTES: usize = 8;
/// bcrypt ignores input past 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(email.validate_email(), "email", "must be a valid email address");
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_BYTES,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= MAX_PASSWORD_BYTES,
        "password",
        "must not be more than 72 bytes long",
    );
}

pub fn validate_name(v: &mut Validator, name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(
        name.len() <= MAX_NAME_BYTES,
        "name",
        "must not be more than 500 bytes long",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let password = Password::hash("pa55word", 4).unwrap();
        assert!(password.matches("pa55word").unwrap());
        assert!(!password.matches("wrong-password").unwrap());
    }

    #[test]
    fn test_registration_fields() {
        let mut v = Validator::new();
        validate_name(&mut v, "");
        validate_email(&mut v, "not-an-email");
        validate_password_plaintext(&mut v, "short");

        assert_eq!(v.errors()["name"], "must be provided");
        assert_eq!(v.errors()["email"], "must be a valid email address");
        assert_eq!(v.errors()["password"], "must be at least 8 bytes long");
    }

    #[test]
    fn test_valid_registration_fields() {
        let mut v = Validator::new();
        validate_name(&mut v, "Alice");
        validate_email(&mut v, "alice@example.com");
        validate_password_plaintext(&mut v, "pa55word");
        assert!(v.valid());
    }

    #[test]
    fn test_password_is_not_serialized() {
        let user = User::new("Alice", "alice@example.com", Password::from_hash("$2b$04$x"));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["activated"], false);
    }
}
