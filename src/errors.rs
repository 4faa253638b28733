use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};
use thiserror::Error;

use crate::external::price_provider::ProviderError;

/// Reasons a screening run could not be evaluated.
///
/// A security failing one of the screening gates is not an error; see
/// [`crate::models::ScreeningVerdict`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreeningError {
    #[error("insufficient history: {required} trading days required, {actual} supplied")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("history is not in chronological order at bar {index}")]
    UnorderedHistory { index: usize },
    #[error("invalid price data: {0}")]
    InvalidPriceData(String),
    #[error("invalid fundamentals: {0}")]
    InvalidFundamentals(String),
    #[error("invalid screening config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
    #[error("Screening error: {0}")]
    Screening(#[from] ScreeningError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::RateLimited => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (StatusCode::TOO_MANY_REQUESTS, headers, "Rate limited").into_response()
            }
            AppError::External(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            AppError::Screening(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::RateLimited => AppError::RateLimited,
            ProviderError::NotFound(_) => AppError::NotFound,
            other => AppError::External(other.to_string()),
        }
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screening_errors_map_to_unprocessable_entity() {
        let err: AppError = ScreeningError::InsufficientHistory { required: 60, actual: 10 }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let err: AppError = ProviderError::RateLimited.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
    }

    #[test]
    fn provider_not_found_maps_to_404() {
        let err: AppError = ProviderError::NotFound("ZZZZ".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
