//! Request and response bodies of the JSON API
//!
//! Field names are camelCase on the wire. Failures are reported as an
//! [`ErrorList`] with HTTP 200; clients branch on the body shape.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MSG_UNEXPECTED: &str = "Unexpected error.";
pub const MSG_UNEXPECTED_RETRY: &str = "Unexpected error, please try again.";
pub const MSG_USER_NOT_FOUND: &str = "User not found.";
pub const MSG_PLACE_NOT_FOUND: &str = "Place not found.";
pub const MSG_MALFORMED_REQUEST: &str = "Malformed request.";

/// Uniform failure body; an empty list is a success for signup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorList {
    #[schema(example = json!(["This email is already in use."]))]
    pub errors: Vec<String>,
}

impl ErrorList {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn one(message: &str) -> Self {
        Self {
            errors: vec![message.to_string()],
        }
    }

    pub fn none() -> Self {
        Self { errors: Vec::new() }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[serde(default)]
    #[schema(example = 45.5017)]
    pub latitude: Option<f64>,
    #[serde(default)]
    #[schema(example = json!(-73.5673))]
    pub longitude: Option<f64>,
    /// Browser geolocation error code; only 0 means the fix is usable
    #[serde(default)]
    #[schema(example = 0)]
    pub error_code: Option<i64>,
}

impl LocationRequest {
    /// Coordinates worth geocoding: error code 0 and both axes present
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.error_code, self.latitude, self.longitude) {
            (Some(0), Some(latitude), Some(longitude)) => Some((latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressRequest {
    #[serde(default)]
    #[schema(example = "Montreal, QC")]
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[schema(example = "6f1c8a52-3c1e-4c4a-9d0e-2c9a1f0b7e11")]
    pub user_id: String,
    #[schema(example = "the-tap-montreal")]
    pub place_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GoingResponse {
    #[schema(example = 3)]
    pub going: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}
