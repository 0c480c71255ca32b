//! Field-level validation that reports every violated field at once.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Collects `field -> message` pairs while a record is checked.
///
/// Only the first message per field is kept, so callers can list checks from
/// most to least fundamental ("must be provided" before range checks).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no check has failed.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Consumes the validator, yielding the error map when anything failed.
    pub fn into_result(self) -> Result<(), BTreeMap<String, String>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// True when every value in the slice is distinct.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
