//! Destination toggle
//!
//! Keeps a user's destination set and the place's going counter in step.
//! The two live in different documents and are never updated in one
//! transaction, so the order is fixed:
//!
//! 1. flip membership in the user document (atomic, reports direction)
//! 2. bump the place counter (+1 with upsert, or -1 clamped at zero)
//! 3. re-read the counter
//!
//! A failure between 1 and 2 leaves the counter stale for that user,
//! which a reconciliation pass can recount; it never leaves a counter
//! change that no user document accounts for.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::store::{Flip, PlaceStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("User not found")]
    UserNotFound,

    #[error("Place not found")]
    PlaceNotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    pub flip: Flip,
    /// Counter value read back after the update
    pub going: i64,
}

pub struct ToggleEngine {
    users: Arc<dyn UserStore>,
    places: Arc<dyn PlaceStore>,
}

impl ToggleEngine {
    pub fn new(users: Arc<dyn UserStore>, places: Arc<dyn PlaceStore>) -> Self {
        Self { users, places }
    }

    /// Add `place_id` to the user's destinations if absent, remove it if
    /// present, and move the place's going counter accordingly.
    ///
    /// Calling it twice in a row restores the original state.
    pub async fn toggle_destination(
        &self,
        user_id: Uuid,
        place_id: &str,
    ) -> Result<Toggled, ToggleError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(ToggleError::UserNotFound);
        }

        // Direction is decided inside the same atomic update that applies it
        let flip = self
            .users
            .flip_destination(user_id, place_id)
            .await?
            .ok_or(ToggleError::UserNotFound)?;

        match flip {
            Flip::Added => {
                self.places.increment(place_id).await?;
            }
            Flip::Removed => match self.places.decrement(place_id).await? {
                None => {
                    tracing::warn!(
                        %user_id,
                        place_id,
                        "Removed destination has no place record, counter drift"
                    );
                    return Err(ToggleError::PlaceNotFound);
                }
                Some(dec) if dec.clamped => {
                    tracing::warn!(
                        %user_id,
                        place_id,
                        "Going counter already zero on removal, clamped"
                    );
                }
                Some(_) => {}
            },
        }

        let going = self
            .places
            .going(place_id)
            .await?
            .ok_or(ToggleError::PlaceNotFound)?;

        tracing::info!(%user_id, place_id, ?flip, going, "Destination toggled");
        Ok(Toggled { flip, going })
    }
}
