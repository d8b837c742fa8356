//! JSON body extractor for the API routes

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use super::types::{ErrorList, MSG_MALFORMED_REQUEST};

/// `Json<T>` whose rejection is an [`ErrorList`] body instead of plain text
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Json<ErrorList>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::warn!(
                    status = %rejection.status(),
                    "Rejected request body: {}",
                    rejection.body_text()
                );
                Err(Json(ErrorList::one(MSG_MALFORMED_REQUEST)))
            }
        }
    }
}
