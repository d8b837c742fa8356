//! Nightlife server
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Client  │───▶│ Auth Gate │───▶│   Handlers   │───▶│  PostgreSQL  │
//! │  (SPA)   │    │   (JWT)   │    │ toggle/login │    │ users/places │
//! └──────────┘    └───────────┘    └──────┬───────┘    └──────────────┘
//!                                         │
//!                                  ┌──────▼───────┐
//!                                  │ Yelp, Google │
//!                                  └──────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;

use nightlife::config::AppConfig;
use nightlife::db::Database;
use nightlife::gateway::{
    self,
    state::{AppState, Stores, Upstreams},
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = nightlife::logging::init_logging(&app_config);

    tracing::info!("Starting nightlife in {} mode", env);
    for upstream in app_config.unconfigured_upstreams() {
        tracing::warn!(upstream, "Credentials not configured, calls will fail");
    }

    let stores = match Database::connect(&app_config.database)
        .await
        .context("Failed to connect to PostgreSQL")?
    {
        Some(db) => {
            db.init_schema()
                .await
                .context("Failed to initialize database schema")?;
            Stores::postgres(&db)
        }
        None => {
            tracing::warn!(
                "No database configured, using in-memory stores (state lost on restart)"
            );
            Stores::memory()
        }
    };

    let upstreams = Upstreams::from_config(&app_config)?;
    let state = Arc::new(AppState::new(&app_config, stores, upstreams));

    gateway::run_server(&app_config.server.host, app_config.server.port, state).await
}
