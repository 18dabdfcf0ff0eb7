use serde::{Deserialize, Serialize};

use crate::models::domain::{
    Coordinate, LocationWithDistance, LocationWithLink, PostingWithCommute, RankedPosting,
};

/// Response for the nearest-locations tool
///
/// `partial` is set when fewer than `requested` valid locations exist within
/// the search window; a short list is still a successful answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindNearestResponse {
    pub origin: Coordinate,
    pub locations: Vec<LocationWithDistance>,
    pub requested: usize,
    pub partial: bool,
}

/// Response for the job-matching tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJobsResponse {
    pub request_id: String,
    pub postings: Vec<RankedPosting>,
    pub eligible_count: usize,
    pub location_count: usize,
    pub failed_locations: usize,
    pub deadline_exceeded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeDistanceResponse {
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: PostingWithCommute,
    pub other_jobs_at_same_location: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobsResponse {
    pub postings: Vec<PostingWithCommute>,
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSearchResponse {
    pub locations: Vec<LocationWithLink>,
    pub total_results: usize,
}

/// Interview arrangements for one posting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewInformationResponse {
    pub job_id: i64,
    pub employer_name: String,
    pub interview_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCountResponse {
    pub total_locations: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
