use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::AppConfig;
use crate::credential::{CredentialCache, TokenSource, YelpTokenSource};
use crate::db::Database;
use crate::geocode::{Geocoder, GoogleGeocoder};
use crate::search::{BusinessSearch, SearchGateway, YelpSearchClient};
use crate::store::{
    MemoryPlaceStore, MemoryUserStore, PgPlaceStore, PgUserStore, PlaceStore, UserStore,
};
use crate::toggle::ToggleEngine;
use crate::user_auth::{AccountService, AuthGate, PublicPaths, TokenIssuer};

/// Persistence backends
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub places: Arc<dyn PlaceStore>,
}

impl Stores {
    pub fn postgres(db: &Database) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(db.pool().clone())),
            places: Arc::new(PgPlaceStore::new(db.pool().clone())),
        }
    }

    /// Process-local stores; state is lost on restart
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            places: Arc::new(MemoryPlaceStore::new()),
        }
    }
}

/// Outbound HTTP integrations
#[derive(Clone)]
pub struct Upstreams {
    pub token_source: Arc<dyn TokenSource>,
    pub search: Arc<dyn BusinessSearch>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl Upstreams {
    /// Yelp + Google clients sharing one connection pool
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            token_source: Arc::new(YelpTokenSource::new(client.clone(), &config.yelp)),
            search: Arc::new(YelpSearchClient::new(client.clone(), &config.yelp)),
            geocoder: Arc::new(GoogleGeocoder::new(client, &config.geocoding)),
        })
    }
}

/// Shared application state
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub toggles: Arc<ToggleEngine>,
    pub search: Arc<SearchGateway>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Probed by the health check
    pub users: Arc<dyn UserStore>,
    pub auth_gate: Arc<AuthGate>,
    pub production: bool,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig, stores: Stores, upstreams: Upstreams) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
        ));
        let credentials = CredentialCache::new(
            upstreams.token_source,
            Duration::from_secs(config.yelp.token_ttl_secs),
        );

        Self {
            accounts: Arc::new(AccountService::new(stores.users.clone(), tokens.clone())),
            toggles: Arc::new(ToggleEngine::new(
                stores.users.clone(),
                stores.places.clone(),
            )),
            search: Arc::new(SearchGateway::new(
                credentials,
                upstreams.search,
                stores.places,
            )),
            geocoder: upstreams.geocoder,
            users: stores.users,
            auth_gate: Arc::new(AuthGate {
                tokens,
                public: PublicPaths::new(&config.auth.public_paths),
            }),
            production: config.server.production,
            public_dir: PathBuf::from(&config.server.public_dir),
        }
    }
}
