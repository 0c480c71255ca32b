//! Authentication and authorization.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → validator.rs (Bearer parse, token shape, credential lookup)
//!     → identity.rs (Anonymous | Authenticated)
//!     → guard.rs (ordered GuardChain per route)
//!     → handler
//! ```

pub mod guard;
pub mod identity;
pub mod validator;

pub use guard::{Guard, GuardChain, Rejection};
pub use identity::{AuthenticatedUser, Identity, ANONYMOUS};
pub use validator::{AuthError, TokenValidator};
