//! Bearer token validation.
//!
//! ```text
//! no header            → Anonymous
//! not "Bearer <token>" → Malformed
//! bad token shape      → Malformed
//! unknown / expired    → InvalidOrExpired
//! storage failure      → Store (server fault)
//! otherwise            → Authenticated { id, activated, permissions }
//! ```

use thiserror::Error;

use crate::auth::identity::Identity;
use crate::data::store::{Models, StoreError};
use crate::data::token::{hash_plaintext, is_well_formed, Scope};

/// Why an `Authorization` header did not yield an identity.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed authentication token")]
    Malformed,

    #[error("invalid or expired authentication token")]
    InvalidOrExpired,

    /// Lookup failed on our side; not the client's fault.
    #[error("credential lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed",
            AuthError::InvalidOrExpired => "invalid_or_expired",
            AuthError::Store(_) => "store",
        }
    }
}

/// Resolves `Authorization` header values against the credential store.
#[derive(Clone)]
pub struct TokenValidator {
    models: Models,
}

impl TokenValidator {
    pub fn new(models: Models) -> Self {
        Self { models }
    }

    /// Turns an optional header value into an identity.
    ///
    /// An empty header value counts as absent.
    pub async fn resolve(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let header = match header {
            None | Some("") => return Ok(Identity::Anonymous),
            Some(value) => value,
        };

        let token = parse_bearer(header)?;
        if !is_well_formed(token) {
            return Err(AuthError::Malformed);
        }

        let hash = hash_plaintext(token);
        match self.models.token_owner(Scope::Authentication, &hash).await? {
            Some(owner) => Ok(Identity::from(owner)),
            None => Err(AuthError::InvalidOrExpired),
        }
    }
}

/// Splits `Bearer <token>`: exactly two space-separated parts, the first
/// literally `Bearer`.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::Malformed),
    }
}
