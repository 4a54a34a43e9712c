use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequestParts, Query},
    http::request::Parts,
    RequestPartsExt,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::api::ApiErrors;

/// Query string extractor that runs `validator` rules before the handler.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ValidatedQueryParams<T>(pub T);

fn map_rejection(err: QueryRejection) -> ApiErrors {
    match err {
        QueryRejection::FailedToDeserializeQueryString(inner) => {
            ApiErrors::BadRequest(format!("Failed to parse query string: {}", inner.body_text()))
        }
        other => ApiErrors::BadRequest(other.body_text()),
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQueryParams<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = ApiErrors;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = parts.extract::<Query<T>>().await.map_err(map_rejection)?;
        query.validate()?;
        Ok(ValidatedQueryParams(query))
    }
}
