//! Request extractors whose rejections render as [`CrmError`].
//!
//! axum's own `Json` and `Path` reject with 415/422 and a plain-text body.
//! Handlers use these wrappers instead so a malformed request is an
//! `invalid_input` like every other bad request.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use log::debug;
use serde::de::DeserializeOwned;

use super::error::CrmError;

#[derive(Debug, Clone, Copy, Default)]
pub struct CrmJson<T>(pub T);

#[derive(Debug, Clone, Copy, Default)]
pub struct CrmPath<T>(pub T);

impl From<JsonRejection> for CrmError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        CrmError::InvalidInput(format!("malformed request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for CrmError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path parameter: {}", rejection.body_text());
        CrmError::InvalidInput(format!("malformed path parameter: {}", rejection.body_text()))
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for CrmJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CrmError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for CrmPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = CrmError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
