//! Nightlife - bar search with "who's going tonight" counters
//!
//! # Modules
//!
//! - [`config`] - YAML + environment configuration
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`store`] - user and place stores (PostgreSQL or in-process)
//! - [`credential`] - single-flight cache for the search API access token
//! - [`search`] - venue search enriched with going counters
//! - [`geocode`] - reverse geocoding of browser coordinates
//! - [`toggle`] - destination toggle keeping user sets and counters in step
//! - [`user_auth`] - signup, login, session tokens and the auth gate
//! - [`gateway`] - HTTP routes, state and server

pub mod config;
pub mod credential;
pub mod db;
pub mod gateway;
pub mod geocode;
pub mod logging;
pub mod search;
pub mod store;
pub mod toggle;
pub mod user_auth;

pub use credential::CredentialCache;
pub use search::SearchGateway;
pub use toggle::{ToggleEngine, ToggleError};
