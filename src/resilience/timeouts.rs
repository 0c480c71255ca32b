//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap storage calls with a deadline
//! - Cancel the wrapped future cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - No retry on expiry; retry policy belongs to the caller

use std::future::Future;
use std::time::Duration;

/// The wrapped operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation exceeded its {0:?} deadline")]
pub struct DeadlineExceeded(pub Duration);

/// Runs `fut`, giving up after `limit`.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded(limit))
}
