//! Search API credential cache
//!
//! Holds one access token for the venue search API and refreshes it when
//! missing or past its TTL. Refreshes are single-flight: the first caller
//! that finds the slot empty starts the acquisition and parks a shared
//! future in the slot; every caller arriving before it resolves awaits
//! that same future and receives the same outcome, success or failure.
//!
//! ```text
//! get_token ──▶ valid token? ──yes──▶ return (no I/O)
//!                   │ no
//!                   ▼
//!            in-flight refresh? ──yes──▶ await shared future
//!                   │ no
//!                   ▼
//!            start refresh, park it, await it
//! ```

pub mod yelp;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::time::Instant;

pub use yelp::YelpTokenSource;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Token request failed: {0}")]
    Network(String),

    #[error("Token endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Malformed token payload: {0}")]
    Payload(String),
}

/// Where fresh access tokens come from
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Perform exactly one outbound acquisition request
    async fn acquire(&self) -> Result<String, AcquisitionError>;
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

impl CachedToken {
    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

type Refresh = Shared<BoxFuture<'static, Result<CachedToken, AcquisitionError>>>;

#[derive(Default)]
struct Slot {
    token: Option<CachedToken>,
    in_flight: Option<Refresh>,
}

struct Inner {
    source: Arc<dyn TokenSource>,
    ttl: Duration,
    slot: Mutex<Slot>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        // The slot is only ever replaced wholesale, so a poisoned guard is still coherent
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide token cache. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<Inner>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                ttl,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Return the cached token, refreshing it first when absent or expired.
    pub async fn get_token(&self) -> Result<String, AcquisitionError> {
        let refresh = {
            let mut slot = self.inner.slot();
            if let Some(token) = &slot.token {
                if token.is_valid_at(Instant::now()) {
                    return Ok(token.value.clone());
                }
                tracing::debug!("Cached search API token expired");
            }
            match slot.in_flight.clone() {
                Some(refresh) => refresh,
                None => {
                    let refresh = self.start_refresh();
                    slot.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await.map(|token| token.value)
    }

    /// Drop the cached token so the next `get_token` acquires a new one.
    pub fn invalidate(&self) {
        let mut slot = self.inner.slot();
        if slot.token.take().is_some() {
            tracing::info!("Search API token invalidated");
        }
    }

    /// Snapshot of the cached entry, if any
    pub fn cached(&self) -> Option<CachedToken> {
        self.inner.slot().token.clone()
    }

    fn start_refresh(&self) -> Refresh {
        let inner = Arc::clone(&self.inner);
        async move {
            tracing::info!("Acquiring search API access token");
            let result = inner.source.acquire().await.map(|value| {
                let issued_at = Instant::now();
                CachedToken {
                    value,
                    issued_at,
                    expires_at: issued_at + inner.ttl,
                }
            });

            {
                let mut slot = inner.slot();
                slot.in_flight = None;
                match &result {
                    Ok(token) => slot.token = Some(token.clone()),
                    Err(e) => tracing::error!("Search API token acquisition failed: {}", e),
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}
