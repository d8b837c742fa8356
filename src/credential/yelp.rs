//! Yelp Fusion OAuth2 client-credentials token source

use async_trait::async_trait;
use serde::Deserialize;

use super::{AcquisitionError, TokenSource};
use crate::config::YelpConfig;

/// Reply of `POST /oauth2/token`
#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct YelpTokenSource {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl YelpTokenSource {
    /// `client` should carry the outbound timeout.
    pub fn new(client: reqwest::Client, config: &YelpConfig) -> Self {
        Self {
            client,
            token_url: format!("{}/oauth2/token", config.api_base.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

#[async_trait]
impl TokenSource for YelpTokenSource {
    async fn acquire(&self) -> Result<String, AcquisitionError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status(status.as_u16()));
        }

        let payload: TokenPayload = response
            .json()
            .await
            .map_err(|e| AcquisitionError::Payload(e.to_string()))?;

        if payload.access_token.is_empty() {
            return Err(AcquisitionError::Payload("empty access_token".to_string()));
        }

        tracing::debug!(
            token_type = payload.token_type.as_deref().unwrap_or("unknown"),
            expires_in = payload.expires_in,
            "Search API token acquired"
        );
        Ok(payload.access_token)
    }
}
