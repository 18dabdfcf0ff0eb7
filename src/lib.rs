//! Commute Match - location-based candidate-to-job matching service
//!
//! This library finds the nearest service locations with open demand and
//! ranks job postings by actual commute time. Routing calls are deduplicated
//! per physical site and fanned out over a bounded worker pool with a
//! per-request deadline.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{haversine_km, JobMatcher, MatchOutcome, NearestLocationFinder, RequestContext};
pub use error::MatchError;
pub use models::{CandidateQuery, Coordinate, JobPosting, Location, RankedPosting};
