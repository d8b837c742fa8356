use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use uuid::Uuid;

use super::super::extract::ApiJson;
use super::super::state::AppState;
use super::super::types::{
    AddressRequest, ErrorList, GoingResponse, MSG_PLACE_NOT_FOUND, MSG_UNEXPECTED,
    MSG_UNEXPECTED_RETRY, MSG_USER_NOT_FOUND, UpdateRequest,
};
use crate::toggle::ToggleError;
use crate::user_auth::{AuthError, AuthErrorCode, Claims};

/// Bars around an address, each with its going count
///
/// POST /api/places-by-address
#[utoipa::path(
    post,
    path = "/api/places-by-address",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Search payload with `going` on every business, or `errors`")
    ),
    tag = "Places"
)]
pub async fn places_by_address(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AddressRequest>,
) -> Result<Json<Value>, Json<ErrorList>> {
    state
        .search
        .search_places(&req.address)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(address = %req.address, "Place search failed: {}", e);
            Json(ErrorList::one(MSG_UNEXPECTED))
        })
}

/// Toggle a place in the caller's destinations
///
/// POST /api/update
#[utoipa::path(
    post,
    path = "/api/update",
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Fresh going count, or `errors`", body = GoingResponse),
        (status = 302, description = "Missing or invalid token, redirected to /")
    ),
    security(("bearer_auth" = [])),
    tag = "Places"
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateRequest>,
) -> Response {
    if claims.sub != req.user_id {
        return AuthError::from_code(AuthErrorCode::SubjectMismatch).into_response();
    }

    let Ok(user_id) = Uuid::parse_str(&req.user_id) else {
        return Json(ErrorList::one(MSG_USER_NOT_FOUND)).into_response();
    };

    match state.toggles.toggle_destination(user_id, &req.place_id).await {
        Ok(toggled) => Json(GoingResponse {
            going: toggled.going,
        })
        .into_response(),
        Err(ToggleError::UserNotFound) => Json(ErrorList::one(MSG_USER_NOT_FOUND)).into_response(),
        Err(ToggleError::PlaceNotFound) => {
            Json(ErrorList::one(MSG_PLACE_NOT_FOUND)).into_response()
        }
        Err(e) => {
            tracing::error!(%user_id, place_id = %req.place_id, "Toggle failed: {}", e);
            Json(ErrorList::one(MSG_UNEXPECTED_RETRY)).into_response()
        }
    }
}
