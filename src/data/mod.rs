//! Data subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → store.rs (Models: id checks, per-call deadline)
//!     → MovieStore / UserStore / TokenStore / PermissionStore / CredentialStore
//!     → memory.rs (default backend)
//! ```
//!
//! # Design Decisions
//! - Versioned writes are compare-and-swap inside the backend, never
//!   read-then-write from the application
//! - Not-found, edit conflicts and duplicates are values, not faults
//! - Validation runs before any write and reports every violated field

pub mod memory;
pub mod movie;
pub mod permissions;
pub mod store;
pub mod token;
pub mod user;
pub mod validator;

pub use memory::MemoryStore;
pub use movie::{Movie, Runtime};
pub use permissions::Permissions;
pub use store::{Models, StoreError, TokenOwner};
pub use token::{Scope, Token};
pub use user::{Password, User};
pub use validator::Validator;
