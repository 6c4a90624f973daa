//! Request extractors with API error reporting

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// JSON body extractor reporting malformed payloads as
/// [`ApiError::BadRequest`]
///
/// The framework default for an unparseable body is a plain-text 422;
/// the wire contract is a 400 with the `{error, code}` body like every
/// other rejected request.
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
