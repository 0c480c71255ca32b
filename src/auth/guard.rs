//! Authorization guards and the ordered chain that runs them.
//!
//! A chain is a plain list: the first guard that rejects wins and nothing
//! after it runs. [`GuardChain::permission`] always puts the authentication
//! and activation guards ahead of the permission check, so an anonymous
//! caller learns it must log in and an inactive one learns it must activate,
//! whatever permissions they hold.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::identity::Identity;

/// Why a guard refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,
}

/// A single check over the caller's identity.
pub trait Guard: Send + Sync {
    /// Stable name, used to make chain order observable.
    fn name(&self) -> &'static str;

    fn check(&self, identity: &Identity) -> Result<(), Rejection>;
}

/// Caller must not be anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireAuthenticated;

impl Guard for RequireAuthenticated {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        match identity {
            Identity::Anonymous => Err(Rejection::AuthenticationRequired),
            Identity::Authenticated(_) => Ok(()),
        }
    }
}

/// Caller must be an activated user. Also rejects anonymous callers on its
/// own, so it is safe to use without [`RequireAuthenticated`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireActivated;

impl Guard for RequireActivated {
    fn name(&self) -> &'static str {
        "activated"
    }

    fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        match identity {
            Identity::Anonymous => Err(Rejection::AuthenticationRequired),
            Identity::Authenticated(user) if !user.activated => Err(Rejection::InactiveAccount),
            Identity::Authenticated(_) => Ok(()),
        }
    }
}

/// Caller must hold a permission code.
#[derive(Debug, Clone)]
pub struct RequirePermission {
    code: String,
}

impl RequirePermission {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Guard for RequirePermission {
    fn name(&self) -> &'static str {
        "permission"
    }

    fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        match identity {
            Identity::Anonymous => Err(Rejection::AuthenticationRequired),
            Identity::Authenticated(user) if user.permissions.includes(&self.code) => Ok(()),
            Identity::Authenticated(_) => Err(Rejection::NotPermitted),
        }
    }
}

/// Ordered guards, outermost first.
#[derive(Clone, Default)]
pub struct GuardChain {
    guards: Arc<Vec<Box<dyn Guard>>>,
}

impl fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl GuardChain {
    pub fn builder() -> GuardChainBuilder {
        GuardChainBuilder::default()
    }

    /// `[authenticated]`
    pub fn authenticated() -> Self {
        Self::builder().require_authenticated().build()
    }

    /// `[authenticated, activated]`
    pub fn activated() -> Self {
        Self::builder().require_authenticated().require_activated().build()
    }

    /// `[authenticated, activated, permission(code)]`
    pub fn permission(code: impl Into<String>) -> Self {
        Self::builder()
            .require_authenticated()
            .require_activated()
            .require_permission(code)
            .build()
    }

    /// Runs every guard in order, stopping at the first rejection.
    pub fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        self.guards.iter().try_for_each(|guard| guard.check(identity))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

/// Appends guards in the order they should run.
#[derive(Default)]
pub struct GuardChainBuilder {
    guards: Vec<Box<dyn Guard>>,
}

impl GuardChainBuilder {
    pub fn guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn require_authenticated(self) -> Self {
        self.guard(RequireAuthenticated)
    }

    pub fn require_activated(self) -> Self {
        self.guard(RequireActivated)
    }

    pub fn require_permission(self, code: impl Into<String>) -> Self {
        self.guard(RequirePermission::new(code))
    }

    pub fn build(self) -> GuardChain {
        GuardChain {
            guards: Arc::new(self.guards),
        }
    }
}
