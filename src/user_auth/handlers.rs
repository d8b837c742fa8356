use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use super::service::{
    AccountError, LoginRequest, MSG_INVALID_CREDENTIALS, Session, SignupRequest,
};
use crate::gateway::extract::ApiJson;
use crate::gateway::state::AppState;
use crate::gateway::types::{CheckTokenRequest, ErrorList, MSG_UNEXPECTED};

/// Register a new user
///
/// POST /api/signup
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Empty `errors` on success, validation messages otherwise", body = ErrorList)
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Json<ErrorList> {
    match state.accounts.signup(req).await {
        Ok(_) => Json(ErrorList::none()),
        Err(AccountError::Validation(messages)) => Json(ErrorList::new(messages)),
        Err(e) => {
            tracing::error!("Signup failed: {}", e);
            Json(ErrorList::one(MSG_UNEXPECTED))
        }
    }
}

/// Login user
///
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token, or `errors` on failure", body = Session)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Session>, Json<ErrorList>> {
    match state.accounts.login(req).await {
        Ok(session) => Ok(Json(session)),
        Err(AccountError::InvalidCredentials) => {
            tracing::warn!("Login rejected: invalid credentials");
            Err(Json(ErrorList::one(MSG_INVALID_CREDENTIALS)))
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            Err(Json(ErrorList::one(MSG_UNEXPECTED)))
        }
    }
}

/// Check whether a stored token is still usable
///
/// POST /api/check-token
#[utoipa::path(
    post,
    path = "/api/check-token",
    request_body = CheckTokenRequest,
    responses(
        (status = 200, description = "true when the token verifies and its user exists", body = bool)
    ),
    tag = "Auth"
)]
pub async fn check_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckTokenRequest>, JsonRejection>,
) -> Json<bool> {
    // An unreadable body is just another unusable token
    let token = payload
        .ok()
        .and_then(|Json(req)| req.token)
        .unwrap_or_default();
    if token.is_empty() {
        return Json(false);
    }
    Json(state.accounts.check_token(&token).await)
}
