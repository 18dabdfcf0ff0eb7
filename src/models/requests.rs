use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{Coordinate, EmploymentType, GenderRequirement};

/// Request to find the nearest locations with open demand
///
/// Exactly one of `origin` or `address` must be supplied. Without `k`, the
/// configured default applies.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FindNearestRequest {
    #[serde(default)]
    pub origin: Option<Coordinate>,
    #[validate(length(min = 1, max = 200))]
    #[serde(default)]
    pub address: Option<String>,
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub k: Option<usize>,
}

/// Request to rank job postings by commute time
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobsRequest {
    pub origin: Coordinate,
    pub gender: GenderRequirement,
    #[serde(default = "default_employment_type")]
    pub employment_type: EmploymentType,
    #[validate(range(exclusive_min = 0.0, max = 200.0))]
    #[serde(default = "default_max_commute_km")]
    pub max_commute_distance_km: f64,
}

fn default_employment_type() -> EmploymentType {
    EmploymentType::FullTime
}

fn default_max_commute_km() -> f64 {
    5.0
}

/// Straight-line distance between two points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeDistanceRequest {
    pub from: Coordinate,
    pub to: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeocodeRequest {
    #[validate(length(min = 1, max = 200))]
    pub address: String,
}

/// Search postings by employer and/or job type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobsRequest {
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub origin: Option<Coordinate>,
    #[validate(range(min = 1, max = 500))]
    #[serde(default = "default_search_limit")]
    pub k: usize,
}

fn default_search_limit() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationSearchQuery {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Optional candidate position on a job lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLookupQuery {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}
