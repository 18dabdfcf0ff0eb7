// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateQuery, Coordinate, DemandEntry, EmploymentType, GenderRequirement, HiringDetails,
    JobPosting, Location, LocationWithDistance, LocationWithLink, PostingWithCommute, RankedPosting, RouteResult,
};
pub use requests::{
    ComputeDistanceRequest, FindNearestRequest, GeocodeRequest, JobLookupQuery,
    LocationSearchQuery, MatchJobsRequest, SearchJobsRequest,
};
pub use responses::{
    ComputeDistanceResponse, ErrorResponse, FindNearestResponse, HealthResponse,
    InterviewInformationResponse, JobDetailResponse, LocationCountResponse,
    LocationSearchResponse, MatchJobsResponse, SearchJobsResponse,
};
