//! User and place persistence
//!
//! Two document-style stores sit behind async traits so the toggle and
//! account logic can run against PostgreSQL in production and the
//! in-process maps in tests:
//!
//! - [`UserStore`]: user id -> {email, password hash, destinations}
//! - [`PlaceStore`]: place id -> going counter
//!
//! Every mutating method is a single-document atomic operation. Nothing
//! here spans two documents; keeping the two stores consistent is the
//! job of [`crate::toggle::ToggleEngine`].

pub mod memory;
pub mod postgres;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::{MemoryPlaceStore, MemoryUserStore};
pub use postgres::{PgPlaceStore, PgUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Email already registered")]
    DuplicateEmail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// PHC-formatted Argon2 hash
    pub password_hash: String,
    pub destinations: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// Direction taken by an atomic destination flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    Added,
    Removed,
}

/// Result of decrementing a going counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decrement {
    pub going: i64,
    /// The counter was already zero and stayed there
    pub clamped: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Explicit uniqueness query used by signup before the insert
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Insert a user with no destinations.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken,
    /// even if a concurrent signup won the race after `email_exists`.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Add `place_id` to the destinations if absent, remove it if present,
    /// as one atomic update, and report which way it went.
    ///
    /// Returns `None` when the user does not exist.
    async fn flip_destination(&self, id: Uuid, place_id: &str)
    -> Result<Option<Flip>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PlaceStore: Send + Sync {
    async fn going(&self, place_id: &str) -> Result<Option<i64>, StoreError>;

    /// Counters for the given ids. Ids absent from the registry are omitted.
    async fn going_many(&self, place_ids: &[String]) -> Result<HashMap<String, i64>, StoreError>;

    /// +1, creating the place at zero first when absent
    async fn increment(&self, place_id: &str) -> Result<i64, StoreError>;

    /// -1, never below zero. `None` when the place does not exist.
    async fn decrement(&self, place_id: &str) -> Result<Option<Decrement>, StoreError>;
}
