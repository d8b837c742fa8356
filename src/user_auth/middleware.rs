use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use super::error::{AuthError, AuthErrorCode};
use super::service::TokenIssuer;

/// Reachable without a token. A trailing `*` marks a prefix pattern.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/favicon.ico",
    "/places",
    "/login",
    "/signup",
    "/api/location",
    "/api/places-by-address",
    "/api/login",
    "/api/signup",
    "/api/check-token",
    "/api/health",
    "/static/*",
    "/assets/*",
    "/docs*",
    "/api-docs/*",
];

/// Compiled public path allowlist
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_suffix('*') {
                Some(prefix) => paths.prefixes.push(prefix.to_string()),
                None => {
                    paths.exact.insert(pattern.to_string());
                }
            }
        }
        paths
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Shared state of the gate; built once at startup
pub struct AuthGate {
    pub tokens: Arc<TokenIssuer>,
    pub public: PublicPaths,
}

/// Bearer token check for every non-public path.
///
/// Verified claims land in the request extensions; whether the subject
/// still exists is left to the handler.
pub async fn auth_gate(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if gate.public.is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())?;
    let claims = gate
        .tokens
        .verify(token)
        .map_err(|e| AuthError::new(AuthErrorCode::InvalidToken, e.to_string()))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::from_code(AuthErrorCode::MissingToken))?
        .to_str()
        .map_err(|_| AuthError::from_code(AuthErrorCode::InvalidFormat))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::from_code(AuthErrorCode::InvalidFormat)),
    }
}
