//! Bearer credentials: generation, hashing and plaintext checks.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::data::validator::Validator;

/// Random bytes behind each token.
const TOKEN_ENTROPY_BYTES: usize = 16;

/// Length of the encoded plaintext (16 bytes, unpadded URL-safe base64).
pub const TOKEN_PLAINTEXT_LEN: usize = 22;

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Authentication,
    Activation,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Authentication => f.write_str("authentication"),
            Scope::Activation => f.write_str("activation"),
        }
    }
}

/// SHA-256 of a token plaintext; the only form kept server side.
pub type TokenHash = [u8; 32];

/// A freshly issued credential.
///
/// Serializes to `{"token", "expiry"}`: the plaintext leaves the server once,
/// in the issuing response.
#[derive(Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: TokenHash,
    #[serde(skip)]
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: Scope,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl Token {
    /// Issues a random token for `user_id` valid for `ttl`.
    pub fn generate(user_id: i64, ttl: Duration, scope: Scope) -> Self {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plaintext = URL_SAFE_NO_PAD.encode(bytes);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            hash: hash_plaintext(&plaintext),
            plaintext,
            user_id,
            expiry: Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            scope,
        }
    }
}

/// Hashes a plaintext token for lookup.
pub fn hash_plaintext(plaintext: &str) -> TokenHash {
    Sha256::digest(plaintext.as_bytes()).into()
}

/// True when `plaintext` has the shape of an issued token.
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_PLAINTEXT_LEN
        && plaintext
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(is_well_formed(plaintext), "token", "must be 22 bytes long");
}
