//! HTTP middleware.
//!
//! Outermost first:
//! ```text
//! trace → request id → metrics → rate limit → fault log → catch panic
//!     → cors → deadline → body limit → authenticate → [route guards] → handler
//! ```

pub mod authenticate;
pub mod authorize;
pub mod faults;
pub mod metrics;

pub use authenticate::authenticate;
pub use authorize::{guarded, require_guards};
pub use faults::{handle_panic, handle_request_timeout, log_internal_faults};
pub use metrics::track_metrics;
