use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub yelp: YelpConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Enables the security response headers
    #[serde(default)]
    pub production: bool,
    /// Directory holding the single-page app (`index.html` + assets)
    pub public_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            production: false,
            public_dir: "public".to_string(),
        }
    }
}

/// PostgreSQL connection. Without a `url` the service runs on in-process stores.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Required; usually supplied through `JWTSECRET`.
    #[serde(default)]
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    /// Paths reachable without a bearer token. A trailing `*` makes a prefix pattern.
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 24 * 60 * 60,
            public_paths: crate::user_auth::middleware::DEFAULT_PUBLIC_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct YelpConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub api_base: String,
    /// Lifetime of the cached access token (180 days)
    pub token_ttl_secs: u64,
}

impl Default for YelpConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: "https://api.yelp.com".to_string(),
            token_ttl_secs: 15_552_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub api_key: String,
    pub api_base: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://maps.googleapis.com".to_string(),
        }
    }
}

/// Outbound HTTP (token, search, geocode)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "nightlife.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            yelp: YelpConfig::default(),
            geocoding: GeocodingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `config/<env>.yaml` (defaults when the file is absent), then
    /// apply environment overrides.
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let mut config = if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        if env == "production" {
            config.server.production = true;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay the deployment variables onto the file configuration.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(dir) = lookup("PUBLIC_DIR") {
            self.server.public_dir = dir;
        }
        if let Some(url) = lookup("DB_URL") {
            self.database.url = Some(url);
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(pass) = lookup("DB_PASS") {
            self.database.password = Some(pass);
        }
        if let Some(secret) = lookup("JWTSECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(id) = lookup("YELP_APP_ID") {
            self.yelp.client_id = id;
        }
        if let Some(secret) = lookup("YELP_APP_SECRET") {
            self.yelp.client_secret = secret;
        }
        if let Some(key) = lookup("GEOCODING_KEY") {
            self.geocoding.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret is not set (JWTSECRET)");
        }
        Ok(())
    }

    /// Outbound integrations without credentials; they fail at call time.
    pub fn unconfigured_upstreams(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.yelp.client_id.is_empty() || self.yelp.client_secret.is_empty() {
            missing.push("yelp");
        }
        if self.geocoding.api_key.is_empty() {
            missing.push("geocoding");
        }
        missing
    }
}
