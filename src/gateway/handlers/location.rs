use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};

use super::super::extract::ApiJson;
use super::super::state::AppState;
use super::super::types::{ErrorList, LocationRequest, MSG_UNEXPECTED};
use crate::geocode::ResolvedAddress;

const DEFAULT_LANGUAGE: &str = "en";

/// Resolve browser coordinates to a street address
///
/// POST /api/location
#[utoipa::path(
    post,
    path = "/api/location",
    request_body = LocationRequest,
    params(
        ("Accept-Language" = Option<String>, Header, description = "Language of the returned address")
    ),
    responses(
        (status = 200, description = "Address (empty when unknown), or `errors`", body = ResolvedAddress)
    ),
    tag = "Places"
)]
pub async fn location(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<LocationRequest>,
) -> Result<Json<ResolvedAddress>, Json<ErrorList>> {
    let Some((latitude, longitude)) = req.position() else {
        tracing::debug!(error_code = ?req.error_code, "Client reported no usable position");
        return Ok(Json(ResolvedAddress::empty()));
    };

    let language = primary_language(&headers);
    state
        .geocoder
        .reverse(latitude, longitude, &language)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Reverse geocoding failed: {}", e);
            Json(ErrorList::one(MSG_UNEXPECTED))
        })
}

/// Primary subtag of the preferred `Accept-Language` entry, `en` when absent
pub fn primary_language(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|tag| tag.split(';').next())
        .and_then(|tag| tag.split('-').next())
        .map(|tag| tag.trim().to_ascii_lowercase())
        .filter(|tag| !tag.is_empty() && tag != "*")
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
