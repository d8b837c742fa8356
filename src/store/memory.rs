//! In-process stores backed by `DashMap`
//!
//! Used by the test suite and when no database is configured. Per-key
//! atomicity comes from holding the shard lock for the duration of each
//! mutation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{Decrement, Flip, NewUser, PlaceStore, StoreError, User, UserStore};

#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    /// email -> user id, doubles as the unique index
    emails: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.emails.contains_key(email))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let created = User {
                    id: Uuid::new_v4(),
                    email: user.email,
                    password_hash: user.password_hash,
                    destinations: HashSet::new(),
                };
                self.users.insert(created.id, created.clone());
                slot.insert(created.id);
                Ok(created)
            }
        }
    }

    async fn flip_destination(
        &self,
        id: Uuid,
        place_id: &str,
    ) -> Result<Option<Flip>, StoreError> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        if user.destinations.remove(place_id) {
            Ok(Some(Flip::Removed))
        } else {
            user.destinations.insert(place_id.to_string());
            Ok(Some(Flip::Added))
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPlaceStore {
    places: DashMap<String, i64>,
}

impl MemoryPlaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a counter directly (tests, fixtures)
    pub fn insert(&self, place_id: impl Into<String>, going: i64) {
        self.places.insert(place_id.into(), going.max(0));
    }
}

#[async_trait]
impl PlaceStore for MemoryPlaceStore {
    async fn going(&self, place_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.places.get(place_id).map(|g| *g))
    }

    async fn going_many(&self, place_ids: &[String]) -> Result<HashMap<String, i64>, StoreError> {
        Ok(place_ids
            .iter()
            .filter_map(|id| self.places.get(id).map(|g| (id.clone(), *g)))
            .collect())
    }

    async fn increment(&self, place_id: &str) -> Result<i64, StoreError> {
        let mut going = self.places.entry(place_id.to_string()).or_insert(0);
        *going += 1;
        Ok(*going)
    }

    async fn decrement(&self, place_id: &str) -> Result<Option<Decrement>, StoreError> {
        let Some(mut going) = self.places.get_mut(place_id) else {
            return Ok(None);
        };
        let clamped = *going <= 0;
        *going = (*going - 1).max(0);
        Ok(Some(Decrement {
            going: *going,
            clamped,
        }))
    }
}
