//! In-process storage backend.
//!
//! Tables are `DashMap`s. A versioned update holds the row's shard lock for
//! the whole compare-and-bump, so two writers racing from the same version
//! cannot both succeed.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::data::movie::Movie;
use crate::data::permissions::Permissions;
use crate::data::store::{
    CredentialStore, MovieStore, PermissionStore, StoreError, TokenOwner, TokenStore, UserStore,
};
use crate::data::token::{Scope, Token, TokenHash};
use crate::data::user::User;

#[derive(Debug, Clone)]
struct StoredToken {
    user_id: i64,
    expiry: DateTime<Utc>,
    scope: Scope,
}

impl StoredToken {
    fn grants(&self, scope: Scope, now: DateTime<Utc>) -> bool {
        self.scope == scope && self.expiry > now
    }
}

/// All tables held in memory.
#[derive(Default)]
pub struct MemoryStore {
    movies: DashMap<i64, Movie>,
    next_movie_id: AtomicI64,
    users: DashMap<i64, User>,
    /// Lowercased email -> user id.
    emails: DashMap<String, i64>,
    next_user_id: AtomicI64,
    tokens: DashMap<TokenHash, StoredToken>,
    permissions: DashMap<i64, Permissions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_of(&self, scope: Scope, hash: &TokenHash, now: DateTime<Utc>) -> Option<i64> {
        self.tokens
            .get(hash)
            .filter(|token| token.grants(scope, now))
            .map(|token| token.user_id)
    }
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert_movie(&self, mut movie: Movie) -> Result<Movie, StoreError> {
        movie.id = self.next_movie_id.fetch_add(1, Ordering::SeqCst) + 1;
        movie.created_at = Utc::now();
        movie.version = 1;
        self.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn get_movie(&self, id: i64) -> Result<Movie, StoreError> {
        self.movies
            .get(&id)
            .map(|m| m.value().clone())
            .ok_or(StoreError::RecordNotFound)
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let mut movies: Vec<Movie> = self.movies.iter().map(|m| m.value().clone()).collect();
        movies.sort_by_key(|m| m.id);
        Ok(movies)
    }

    async fn update_movie(&self, movie: &Movie) -> Result<i32, StoreError> {
        let mut stored = self
            .movies
            .get_mut(&movie.id)
            .ok_or(StoreError::RecordNotFound)?;

        if stored.version != movie.version {
            return Err(StoreError::EditConflict);
        }

        stored.title = movie.title.clone();
        stored.year = movie.year;
        stored.runtime = movie.runtime;
        stored.genres = movie.genres.clone();
        stored.version += 1;
        Ok(stored.version)
    }

    async fn delete_movie(&self, id: i64) -> Result<(), StoreError> {
        self.movies
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User, StoreError> {
        match self.emails.entry(user.email.to_lowercase()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                user.id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                user.created_at = Utc::now();
                user.version = 1;
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let id = self
            .emails
            .get(&email.to_lowercase())
            .map(|id| *id)
            .ok_or(StoreError::RecordNotFound)?;
        self.users
            .get(&id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::RecordNotFound)
    }

    async fn update_user(&self, user: &User) -> Result<i32, StoreError> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or(StoreError::RecordNotFound)?;

        if stored.version != user.version {
            return Err(StoreError::EditConflict);
        }

        // Email is the index key and stays fixed.
        stored.name = user.name.clone();
        stored.password = user.password.clone();
        stored.activated = user.activated;
        stored.version += 1;
        Ok(stored.version)
    }

    async fn get_user_for_token(
        &self,
        scope: Scope,
        hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let user_id = self
            .owner_of(scope, hash, now)
            .ok_or(StoreError::RecordNotFound)?;
        self.users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or(StoreError::RecordNotFound)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert_token(&self, token: &Token) -> Result<(), StoreError> {
        self.tokens.insert(
            token.hash,
            StoredToken {
                user_id: token.user_id,
                expiry: token.expiry,
                scope: token.scope,
            },
        );
        Ok(())
    }

    async fn delete_tokens_for_user(&self, scope: Scope, user_id: i64) -> Result<(), StoreError> {
        self.tokens
            .retain(|_, token| !(token.scope == scope && token.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn get_permissions_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        Ok(self
            .permissions
            .get(&user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[&str],
    ) -> Result<(), StoreError> {
        let mut granted = self.permissions.entry(user_id).or_default();
        for code in codes {
            granted.insert(*code);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn token_owner(
        &self,
        scope: Scope,
        hash: &TokenHash,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenOwner>, StoreError> {
        let Some(user_id) = self.owner_of(scope, hash, now) else {
            return Ok(None);
        };
        let Some(activated) = self.users.get(&user_id).map(|u| u.activated) else {
            return Ok(None);
        };
        let permissions = self
            .permissions
            .get(&user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default();

        Ok(Some(TokenOwner {
            user_id,
            activated,
            permissions,
        }))
    }
}
