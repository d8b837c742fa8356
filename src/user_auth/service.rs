use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::store::{NewUser, StoreError, User, UserStore};

pub const MSG_INVALID_EMAIL: &str = "Not a valid email.";
pub const MSG_EMAIL_TAKEN: &str = "This email is already in use.";
pub const MSG_SHORT_PASSWORD: &str = "Password should have at least 6 characters.";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// User Signup Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Not a valid email."))]
    #[schema(example = "a@b.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password should have at least 6 characters."))]
    #[schema(example = "secret1")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[schema(example = "a@b.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "secret1")]
    pub password: String,
}

/// Login reply
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

#[derive(Debug, Error)]
pub enum AccountError {
    /// User-facing messages, email first
    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Signs and verifies session tokens with the process-wide HS256 secret
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp();

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Register a new user
    ///
    /// Syntactic checks first, then an explicit uniqueness query; the
    /// store's unique constraint catches signups racing past that query.
    pub async fn signup(&self, req: SignupRequest) -> Result<User, AccountError> {
        let mut errors = Vec::new();

        let syntax = req.validate().err();
        let field_message = |field: &str| {
            syntax
                .as_ref()
                .and_then(|e| e.field_errors().get(field).and_then(|errs| errs.first()))
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
        };

        match field_message("email") {
            Some(msg) => errors.push(msg),
            None => {
                if self.users.email_exists(&req.email).await? {
                    errors.push(MSG_EMAIL_TAKEN.to_string());
                }
            }
        }
        if let Some(msg) = field_message("password") {
            errors.push(msg);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let password_hash = hash_password(req.password).await?;
        match self
            .users
            .create(NewUser {
                email: req.email,
                password_hash,
            })
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                Ok(user)
            }
            Err(StoreError::DuplicateEmail) => {
                tracing::warn!("Concurrent signup lost the unique email race");
                Err(AccountError::Validation(vec![MSG_EMAIL_TAKEN.to_string()]))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<Session, AccountError> {
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        verify_password(req.password, user.password_hash.clone()).await?;

        let token = self.tokens.issue(user.id)?;
        Ok(Session {
            token,
            user_id: user.id,
        })
    }

    /// True when the token verifies and names an existing user
    pub async fn check_token(&self, token: &str) -> bool {
        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Token check rejected: {}", e);
                return false;
            }
        };
        let Some(user_id) = claims.user_id() else {
            return false;
        };
        match self.users.find_by_id(user_id).await {
            Ok(user) => user.is_some(),
            Err(e) => {
                tracing::error!("Token check lookup failed: {}", e);
                false
            }
        }
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AccountError::Hashing(e.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<(), AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|e| AccountError::Hashing(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => Err(AccountError::InvalidCredentials),
            Err(e) => Err(AccountError::Hashing(e.to_string())),
        }
    })
    .await
    .map_err(|e| AccountError::Hashing(e.to_string()))?
}
