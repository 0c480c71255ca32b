//! Who a request is acting as.

use std::sync::Arc;

use crate::data::permissions::Permissions;
use crate::data::store::TokenOwner;

/// Resolved once per request by the token validator and read-only afterwards.
///
/// Stored as a typed request extension and handed explicitly to the
/// authorization chain. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Anonymous,
    Authenticated(AuthenticatedUser),
}

/// The shared anonymous identity.
pub static ANONYMOUS: Identity = Identity::Anonymous;

/// Attributes of a user proven by a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub activated: bool,
    pub permissions: Arc<Permissions>,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }
}

impl From<TokenOwner> for Identity {
    fn from(owner: TokenOwner) -> Self {
        Identity::Authenticated(AuthenticatedUser {
            id: owner.user_id,
            activated: owner.activated,
            permissions: Arc::new(owner.permissions),
        })
    }
}
