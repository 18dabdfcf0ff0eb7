// Core algorithm exports
pub mod context;
pub mod distance;
pub mod filters;
pub mod lookup;
pub mod matcher;
pub mod nearest;

pub use context::RequestContext;
pub use distance::{calculate_bounding_box, haversine_km, is_within_bounding_box, round_km, BoundingBox};
pub use filters::{eligible_postings, matches_candidate, open_demand, parse_demand_summary, EligiblePosting};
pub use lookup::{
    attach_commutes, interview_information, job_detail, other_jobs_at_same_location, search_jobs,
    search_locations_by_name, JobSearch,
};
pub use matcher::{group_by_location, JobMatcher, LocationGroups, MatchOutcome, RouteBatch};
pub use nearest::NearestLocationFinder;
