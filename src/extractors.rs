use axum::async_trait;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// Path parameters that don't deserialize can't name a stored file, so every
/// rejection surfaces as [`AppError::FileNotFound`].
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let path_parts = axum::extract::Path::<T>::from_request_parts(parts, state).await;
        match path_parts {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                match rejection {
                    PathRejection::FailedToDeserializePathParams(inner) => {
                        tracing::debug!("unusable path parameter: {}", inner.body_text());
                    }
                    err => {
                        tracing::warn!("Unhandled path rejection error: {err:?}");
                    }
                }
                Err(AppError::FileNotFound)
            }
        }
    }
}

pub struct Multipart(pub axum::extract::Multipart);

#[async_trait]
impl<S> FromRequest<S> for Multipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Multipart::from_request(req, state).await {
            Ok(value) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!("rejected upload body: {rejection}");
                Err(AppError::MalformedUpload)
            }
        }
    }
}
