//! Yelp Fusion business search

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::{BusinessSearch, SearchError};
use crate::config::YelpConfig;

/// Search radius in meters (Yelp maximum is 40000)
pub const SEARCH_RADIUS_M: u32 = 20_000;
pub const SEARCH_CATEGORIES: &str = "bars";

pub struct YelpSearchClient {
    client: reqwest::Client,
    search_url: String,
}

impl YelpSearchClient {
    pub fn new(client: reqwest::Client, config: &YelpConfig) -> Self {
        Self {
            client,
            search_url: format!(
                "{}/v3/businesses/search",
                config.api_base.trim_end_matches('/')
            ),
        }
    }
}

#[async_trait]
impl BusinessSearch for YelpSearchClient {
    async fn search(&self, token: &str, address: &str) -> Result<Value, SearchError> {
        let radius = SEARCH_RADIUS_M.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .bearer_auth(token)
            .query(&[
                ("location", address),
                ("radius", radius.as_str()),
                ("categories", SEARCH_CATEGORIES),
                ("sort_by", "best_match"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SearchError::Unauthorized),
            // e.g. 400 LOCATION_NOT_FOUND: a payload without businesses, not a fault
            status if status.is_client_error() => {
                let body = response.json::<Value>().await.unwrap_or(Value::Null);
                tracing::warn!(%status, address, "Search API declined the query: {}", body);
                Ok(body)
            }
            status if !status.is_success() => Err(SearchError::Status(status.as_u16())),
            _ => response
                .json::<Value>()
                .await
                .map_err(|e| SearchError::Payload(e.to_string())),
        }
    }
}
