//! Venue search with going counters
//!
//! [`SearchGateway`] fetches a token from the [`CredentialCache`], runs the
//! external search and stamps every returned business with its `going`
//! count from the place registry. The registry is only read here; a place
//! nobody has toggled yet reports zero.

pub mod yelp;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

use crate::credential::{AcquisitionError, CredentialCache};
use crate::store::{PlaceStore, StoreError};

pub use yelp::YelpSearchClient;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search credential unavailable: {0}")]
    Credential(#[from] AcquisitionError),

    #[error("Search request failed: {0}")]
    Network(String),

    #[error("Search API rejected the access token")]
    Unauthorized,

    #[error("Search API returned HTTP {0}")]
    Status(u16),

    #[error("Malformed search payload: {0}")]
    Payload(String),

    #[error("Place registry unavailable: {0}")]
    Store(#[from] StoreError),
}

/// The external business search call
#[async_trait]
pub trait BusinessSearch: Send + Sync {
    async fn search(&self, token: &str, address: &str) -> Result<Value, SearchError>;
}

pub struct SearchGateway {
    credentials: CredentialCache,
    client: Arc<dyn BusinessSearch>,
    places: Arc<dyn PlaceStore>,
}

impl SearchGateway {
    pub fn new(
        credentials: CredentialCache,
        client: Arc<dyn BusinessSearch>,
        places: Arc<dyn PlaceStore>,
    ) -> Self {
        Self {
            credentials,
            client,
            places,
        }
    }

    /// Search bars around `address`; each business gains a `going` field.
    ///
    /// Fails as a whole: a credential failure never reaches the search API,
    /// and a registry failure discards the search result.
    pub async fn search_places(&self, address: &str) -> Result<Value, SearchError> {
        let token = self.credentials.get_token().await?;

        let mut payload = match self.client.search(&token, address).await {
            Err(SearchError::Unauthorized) => {
                self.credentials.invalidate();
                return Err(SearchError::Unauthorized);
            }
            other => other?,
        };

        self.attach_going(&mut payload).await?;
        Ok(payload)
    }

    async fn attach_going(&self, payload: &mut Value) -> Result<(), SearchError> {
        let Some(businesses) = payload.get_mut("businesses").and_then(Value::as_array_mut) else {
            tracing::warn!("Search payload has no business list, returning no results");
            *payload = json!({ "businesses": [], "total": 0 });
            return Ok(());
        };

        let ids: Vec<String> = businesses
            .iter()
            .filter_map(business_id)
            .map(str::to_owned)
            .collect();
        let going = self.places.going_many(&ids).await?;

        for business in businesses.iter_mut() {
            let count = business_id(business)
                .and_then(|id| going.get(id))
                .copied()
                .unwrap_or(0);
            if let Some(fields) = business.as_object_mut() {
                fields.insert("going".to_string(), Value::from(count));
            }
        }
        Ok(())
    }
}

fn business_id(business: &Value) -> Option<&str> {
    business.get("id").and_then(Value::as_str)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a canned payload and records every call
    pub struct MockSearch {
        payload: Mutex<Result<Value, u16>>,
        calls: AtomicUsize,
        tokens: Mutex<Vec<String>>,
    }

    impl MockSearch {
        pub fn returning(payload: Value) -> Self {
            Self {
                payload: Mutex::new(Ok(payload)),
                calls: AtomicUsize::new(0),
                tokens: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_with(status: u16) -> Self {
            let search = Self::returning(Value::Null);
            *search.payload.lock().unwrap() = Err(status);
            search
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BusinessSearch for MockSearch {
        async fn search(&self, token: &str, _address: &str) -> Result<Value, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens.lock().unwrap().push(token.to_string());
            match &*self.payload.lock().unwrap() {
                Ok(payload) => Ok(payload.clone()),
                Err(401) => Err(SearchError::Unauthorized),
                Err(status) => Err(SearchError::Status(*status)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockSearch;
    use super::*;
    use crate::credential::mock::MockTokenSource;
    use crate::store::MemoryPlaceStore;
    use std::time::Duration;

    fn gateway(
        source: Arc<MockTokenSource>,
        search: Arc<MockSearch>,
        places: Arc<MemoryPlaceStore>,
    ) -> SearchGateway {
        let cache = CredentialCache::new(source, Duration::from_secs(3600));
        SearchGateway::new(cache, search, places)
    }

    fn two_bars() -> Value {
        json!({
            "businesses": [
                { "id": "bar-1", "name": "The Tap" },
                { "id": "bar-2", "name": "Night Owl" }
            ],
            "total": 2
        })
    }

    #[tokio::test]
    async fn test_businesses_enriched_with_going() {
        let places = Arc::new(MemoryPlaceStore::new());
        places.insert("bar-1", 3);
        let search = Arc::new(MockSearch::returning(two_bars()));
        let gw = gateway(
            Arc::new(MockTokenSource::new(Duration::ZERO)),
            search.clone(),
            places,
        );

        let result = gw.search_places("Montreal").await.unwrap();

        assert_eq!(result["businesses"][0]["going"], 3);
        assert_eq!(result["businesses"][1]["going"], 0);
        assert_eq!(result["businesses"][1]["name"], "Night Owl");
        assert_eq!(search.tokens(), vec!["token-1".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_places_are_not_created() {
        let places = Arc::new(MemoryPlaceStore::new());
        let gw = gateway(
            Arc::new(MockTokenSource::new(Duration::ZERO)),
            Arc::new(MockSearch::returning(two_bars())),
            places.clone(),
        );

        gw.search_places("Montreal").await.unwrap();
        assert!(places.going("bar-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credential_failure_skips_search() {
        let search = Arc::new(MockSearch::returning(two_bars()));
        let gw = gateway(
            Arc::new(MockTokenSource::failing(Duration::ZERO, 1)),
            search.clone(),
            Arc::new(MemoryPlaceStore::new()),
        );

        let err = gw.search_places("Montreal").await.unwrap_err();
        assert!(matches!(err, SearchError::Credential(_)));
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_list_payload_yields_empty_result() {
        let gw = gateway(
            Arc::new(MockTokenSource::new(Duration::ZERO)),
            Arc::new(MockSearch::returning(
                json!({ "error": { "code": "LOCATION_NOT_FOUND" } }),
            )),
            Arc::new(MemoryPlaceStore::new()),
        );

        let result = gw.search_places("nowhere").await.unwrap();
        assert_eq!(result["businesses"], json!([]));
    }

    #[tokio::test]
    async fn test_rejected_token_is_invalidated() {
        let source = Arc::new(MockTokenSource::new(Duration::ZERO));
        let gw = gateway(
            source.clone(),
            Arc::new(MockSearch::failing_with(401)),
            Arc::new(MemoryPlaceStore::new()),
        );

        assert!(matches!(
            gw.search_places("x").await,
            Err(SearchError::Unauthorized)
        ));
        assert!(gw.search_places("x").await.is_err());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let gw = gateway(
            Arc::new(MockTokenSource::new(Duration::ZERO)),
            Arc::new(MockSearch::failing_with(503)),
            Arc::new(MemoryPlaceStore::new()),
        );

        assert!(matches!(
            gw.search_places("x").await,
            Err(SearchError::Status(503))
        ));
    }
}
