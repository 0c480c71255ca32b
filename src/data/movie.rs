//! The movie record and its validation rules.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::data::validator::{unique, Validator};

/// Running time in whole minutes.
///
/// On the wire this is the string `"<n> mins"` in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

/// Rejection for runtimes not of the form `"<n> mins"`.
#[derive(Debug, thiserror::Error)]
#[error("invalid runtime format")]
pub struct InvalidRuntimeFormat;

impl Runtime {
    pub fn parse(value: &str) -> Result<Self, InvalidRuntimeFormat> {
        let mut parts = value.split(' ');
        let (Some(minutes), Some("mins"), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(InvalidRuntimeFormat);
        };
        minutes
            .parse::<i32>()
            .map(Runtime)
            .map_err(|_| InvalidRuntimeFormat)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)
            .map_err(|_| de::Error::custom(InvalidRuntimeFormat))?;
        Runtime::parse(&raw).map_err(de::Error::custom)
    }
}

/// A catalog entry.
///
/// `version` starts at 1 and is bumped by the store on every successful
/// update; clients echo the version they read to guard their edits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero_year")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i32,
}

fn is_zero_year(year: &i32) -> bool {
    *year == 0
}

impl Movie {
    /// A not-yet-persisted movie; id, timestamp and version are assigned on insert.
    pub fn new(title: impl Into<String>, year: i32, runtime: Runtime, genres: Vec<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            title: title.into(),
            year,
            runtime,
            genres,
            version: 0,
        }
    }
}

pub const MIN_YEAR: i32 = 1888;
pub const MAX_TITLE_BYTES: usize = 500;
pub const MAX_GENRES: usize = 5;

/// Checks every movie field, recording one message per violated field.
pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= MAX_TITLE_BYTES,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= MIN_YEAR, "year", "must be greater than 1888");
    v.check(
        movie.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(!movie.runtime.is_zero(), "runtime", "must be provided");
    v.check(movie.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= MAX_GENRES,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(unique(&movie.genres), "genres", "must not contain duplicate values");
}
