use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::services::{ProviderError, StoreError};

/// Errors surfaced by the matching tools
///
/// Per-location routing failures never reach this type from the matcher;
/// they are absorbed and only shrink the result set.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Address could not be geocoded: {0}")]
    GeocodeUnresolved(String),

    #[error("Upstream quota exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("No route found: {0}")]
    RoutingUnresolved(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Map a geocoding failure; an unresolved address is a user error
    pub fn from_geocode(address: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::Unresolved(reason) => {
                MatchError::GeocodeUnresolved(format!("{} ({})", address, reason))
            }
            other => other.into(),
        }
    }

    /// Stable machine-readable code for the protocol layer
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "invalid_input",
            MatchError::GeocodeUnresolved(_) => "geocode_unresolved",
            MatchError::RateLimited { .. } => "rate_limited",
            MatchError::RoutingUnresolved(_) => "routing_unresolved",
            MatchError::UpstreamUnavailable(_) => "upstream_unavailable",
            MatchError::DeadlineExceeded => "deadline_exceeded",
            MatchError::NotFound(_) => "not_found",
            MatchError::Store(_) => "store_error",
        }
    }
}

impl From<ProviderError> for MatchError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { attempts } => MatchError::RateLimited { attempts },
            ProviderError::Unavailable { .. } => MatchError::UpstreamUnavailable(err.to_string()),
            ProviderError::Unresolved(reason) => MatchError::RoutingUnresolved(reason),
            ProviderError::InvalidResponse(_) => MatchError::UpstreamUnavailable(err.to_string()),
        }
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MatchError::GeocodeUnresolved(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MatchError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            MatchError::RoutingUnresolved(_) => StatusCode::BAD_GATEWAY,
            MatchError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MatchError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
