//! Storage seams and the [`Models`] facade handlers talk to.
//!
//! Backends implement the per-table traits below. `Models` is the only way the
//! rest of the service reaches them: it rejects impossible ids before any
//! round-trip and bounds every call with the configured query timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::memory::MemoryStore;
use crate::data::movie::Movie;
use crate::data::permissions::Permissions;
use crate::data::token::{Scope, Token, TokenHash};
use crate::data::user::User;
use crate::resilience::timeouts::{with_deadline, DeadlineExceeded};

/// Storage-layer failures.
///
/// `RecordNotFound`, `EditConflict` and `DuplicateEmail` are expected outcomes
/// the caller can act on; the rest are server-side faults.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    RecordNotFound,

    /// The row's version moved on since the caller read it.
    #[error("edit conflict")]
    EditConflict,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Owner attributes resolved from a credential in a single fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenOwner {
    pub user_id: i64,
    pub activated: bool,
    pub permissions: Permissions,
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Persists a new movie, assigning id, creation time and version 1.
    async fn insert_movie(&self, movie: Movie) -> Result<Movie, StoreError>;

    async fn get_movie(&self, id: i64) -> Result<Movie, StoreError>;

    /// All movies ordered by id.
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError>;

    /// Writes `movie` only if the stored version still equals `movie.version`,
    /// bumping it by one. The check and the write must be a single atomic step
    /// inside the backend. Returns the new version.
    async fn update_movie(&self, movie: &Movie) -> Result<i32, StoreError>;

    async fn delete_movie(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user; fails with `DuplicateEmail` if the address is taken.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Versioned write, same contract as [`MovieStore::update_movie`].
    async fn update_user(&self, user: &User) -> Result<i32, StoreError>;

    /// The user owning an unexpired token of `scope` with this hash.
    async fn get_user_for_token(
        &self,
        scope: Scope,
        hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, token: &Token) -> Result<(), StoreError>;

    async fn delete_tokens_for_user(&self, scope: Scope, user_id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn get_permissions_for_user(&self, user_id: i64) -> Result<Permissions, StoreError>;

    async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[&str],
    ) -> Result<(), StoreError>;
}

/// Lookup used by the bearer-token validator.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Owner of an unexpired token of `scope` with this hash, together with its
    /// activation flag and permissions. `None` when nothing matches.
    async fn token_owner(
        &self,
        scope: Scope,
        hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenOwner>, StoreError>;
}

/// Handles to every table plus the per-call deadline.
#[derive(Clone)]
pub struct Models {
    movies: Arc<dyn MovieStore>,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    permissions: Arc<dyn PermissionStore>,
    credentials: Arc<dyn CredentialStore>,
    query_timeout: Duration,
}

impl Models {
    /// Everything backed by one fresh [`MemoryStore`].
    pub fn in_memory(query_timeout: Duration) -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()), query_timeout)
    }

    /// Every table served by a single backend.
    pub fn from_backend<B>(backend: Arc<B>, query_timeout: Duration) -> Self
    where
        B: MovieStore + UserStore + TokenStore + PermissionStore + CredentialStore + 'static,
    {
        Self {
            movies: backend.clone(),
            users: backend.clone(),
            tokens: backend.clone(),
            permissions: backend.clone(),
            credentials: backend,
            query_timeout,
        }
    }

    /// Swaps the movie table for another implementation.
    pub fn with_movies(mut self, movies: Arc<dyn MovieStore>) -> Self {
        self.movies = movies;
        self
    }

    /// Swaps the credential lookup for another implementation.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        with_deadline(self.query_timeout, fut).await?
    }

    pub async fn insert_movie(&self, movie: Movie) -> Result<Movie, StoreError> {
        self.bounded(self.movies.insert_movie(movie)).await
    }

    pub async fn get_movie(&self, id: i64) -> Result<Movie, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        self.bounded(self.movies.get_movie(id)).await
    }

    pub async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        self.bounded(self.movies.list_movies()).await
    }

    pub async fn update_movie(&self, movie: &Movie) -> Result<i32, StoreError> {
        if movie.id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        self.bounded(self.movies.update_movie(movie)).await
    }

    pub async fn delete_movie(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        self.bounded(self.movies.delete_movie(id)).await
    }

    pub async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.bounded(self.users.insert_user(user)).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.bounded(self.users.get_user_by_email(email)).await
    }

    pub async fn update_user(&self, user: &User) -> Result<i32, StoreError> {
        self.bounded(self.users.update_user(user)).await
    }

    pub async fn get_user_for_token(
        &self,
        scope: Scope,
        hash: &TokenHash,
    ) -> Result<User, StoreError> {
        self.bounded(self.users.get_user_for_token(scope, hash, Utc::now()))
            .await
    }

    pub async fn insert_token(&self, token: &Token) -> Result<(), StoreError> {
        self.bounded(self.tokens.insert_token(token)).await
    }

    pub async fn delete_tokens_for_user(
        &self,
        scope: Scope,
        user_id: i64,
    ) -> Result<(), StoreError> {
        self.bounded(self.tokens.delete_tokens_for_user(scope, user_id))
            .await
    }

    pub async fn get_permissions_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        self.bounded(self.permissions.get_permissions_for_user(user_id))
            .await
    }

    pub async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[&str],
    ) -> Result<(), StoreError> {
        self.bounded(self.permissions.add_permissions_for_user(user_id, codes))
            .await
    }

    pub async fn token_owner(
        &self,
        scope: Scope,
        hash: &TokenHash,
    ) -> Result<Option<TokenOwner>, StoreError> {
        self.bounded(self.credentials.token_owner(scope, hash, Utc::now()))
            .await
    }
}
