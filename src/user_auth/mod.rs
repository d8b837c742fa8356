//! Accounts and the auth gate
//!
//! - [`service`]: signup, login, token check; HS256 session tokens
//! - [`middleware`]: bearer token gate with a public path allowlist
//! - [`handlers`]: the `/api/signup`, `/api/login`, `/api/check-token` routes

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod service;

pub use error::{AuthError, AuthErrorCode};
pub use middleware::{AuthGate, DEFAULT_PUBLIC_PATHS, PublicPaths, auth_gate};
pub use service::{
    AccountError, AccountService, Claims, LoginRequest, Session, SignupRequest, TokenIssuer,
};
