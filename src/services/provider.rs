//! Seams to the external geocoding and routing providers.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Coordinate, RouteResult};

/// Typed outcome of a failed provider call, after retries
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("quota exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("provider unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },

    #[error("provider could not resolve request: {0}")]
    Unresolved(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Resolves free-text addresses to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ProviderError>;
}

/// Point-to-point commute distance and duration
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult, ProviderError>;
}
