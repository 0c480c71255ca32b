//! Resilience subsystem.
//!
//! Every storage-bound call made while serving a request passes through
//! [`timeouts::with_deadline`]; an expired deadline is reported as a
//! server-side fault and never retried here.

pub mod timeouts;
