//! Direct lookups over the location and posting pools.

use std::collections::BTreeSet;

use crate::core::context::RequestContext;
use crate::core::distance::{haversine_km, round_km};
use crate::core::matcher::{group_by_location, JobMatcher};
use crate::error::MatchError;
use crate::models::{
    Coordinate, InterviewInformationResponse, JobDetailResponse, JobPosting, Location,
    LocationWithLink, PostingWithCommute,
};
use crate::services::amap::marker_url;

/// Locations whose name contains `fragment`, ignoring case
pub fn search_locations_by_name(pool: &[Location], fragment: &str) -> Vec<LocationWithLink> {
    let needle = fragment.trim().to_lowercase();

    pool.iter()
        .filter(|location| location.name.to_lowercase().contains(&needle))
        .map(|location| LocationWithLink {
            map_url: location
                .coordinate
                .map(|coordinate| marker_url(coordinate, &location.name)),
            location: location.clone(),
        })
        .collect()
}

/// Distinct job types of the other recruiting postings at the same employer site
pub fn other_jobs_at_same_location(posting: &JobPosting, pool: &[JobPosting]) -> Vec<String> {
    let Some(location_name) = posting.location_name.as_deref() else {
        return Vec::new();
    };

    pool.iter()
        .filter(|other| {
            other.id != posting.id
                && other.currently_recruiting
                && other.employer_name == posting.employer_name
                && other.location_name.as_deref() == Some(location_name)
        })
        .map(|other| other.job_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One posting with optional commute metrics from `origin`
///
/// A routing failure leaves the commute fields empty instead of failing
/// the lookup.
pub async fn job_detail(
    matcher: &JobMatcher,
    ctx: &RequestContext,
    posting: JobPosting,
    pool: &[JobPosting],
    origin: Option<Coordinate>,
) -> JobDetailResponse {
    let other_jobs = other_jobs_at_same_location(&posting, pool);

    let job = match origin {
        Some(origin) => attach_commutes(matcher, ctx, origin, vec![posting.clone()])
            .await
            .pop()
            .unwrap_or_else(|| without_commute(posting)),
        None => without_commute(posting),
    };

    JobDetailResponse {
        job,
        other_jobs_at_same_location: other_jobs,
    }
}

/// Who runs the interview for a posting, and when
pub fn interview_information(posting: &JobPosting) -> InterviewInformationResponse {
    InterviewInformationResponse {
        job_id: posting.id,
        employer_name: posting.employer_name.clone(),
        interview_time: posting.details.interview_time.clone(),
    }
}

/// Filters for [`search_jobs`]
#[derive(Debug, Clone, Default)]
pub struct JobSearch {
    pub employer_name: Option<String>,
    pub job_type: Option<String>,
    pub origin: Option<Coordinate>,
    pub k: usize,
}

/// Recruiting postings matching employer and/or job type
///
/// With an origin, results are the `k` nearest by straight line with commute
/// metrics attached; without one they are ordered by job type then employer.
pub async fn search_jobs(
    matcher: &JobMatcher,
    ctx: &RequestContext,
    pool: &[JobPosting],
    search: &JobSearch,
) -> Result<Vec<PostingWithCommute>, MatchError> {
    let employer = normalized(search.employer_name.as_deref());
    let job_type = normalized(search.job_type.as_deref());
    if employer.is_none() && job_type.is_none() {
        return Err(MatchError::InvalidInput(
            "at least one of employerName or jobType is required".to_string(),
        ));
    }

    let mut found: Vec<&JobPosting> = pool
        .iter()
        .filter(|posting| posting.currently_recruiting)
        .filter(|posting| contains(&posting.employer_name, employer.as_deref()))
        .filter(|posting| contains(&posting.job_type, job_type.as_deref()))
        .collect();

    tracing::debug!("Job search matched {} recruiting postings", found.len());

    let Some(origin) = search.origin else {
        found.sort_by(|a, b| {
            a.job_type
                .cmp(&b.job_type)
                .then_with(|| a.employer_name.cmp(&b.employer_name))
        });
        return Ok(found
            .into_iter()
            .take(search.k)
            .cloned()
            .map(without_commute)
            .collect());
    };

    let mut by_distance: Vec<(f64, &JobPosting)> = found
        .into_iter()
        .filter_map(|posting| {
            posting
                .coordinate
                .map(|coordinate| (haversine_km(origin, coordinate), posting))
        })
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
    by_distance.truncate(search.k);

    let nearest: Vec<JobPosting> = by_distance.into_iter().map(|(_, p)| p.clone()).collect();
    Ok(attach_commutes(matcher, ctx, origin, nearest).await)
}

/// Attach straight-line and routed commute metrics, one routing call per location
///
/// Postings without a coordinate, or whose location could not be routed,
/// keep empty commute fields. Input order is preserved.
pub async fn attach_commutes(
    matcher: &JobMatcher,
    ctx: &RequestContext,
    origin: Coordinate,
    postings: Vec<JobPosting>,
) -> Vec<PostingWithCommute> {
    let groups = group_by_location(postings.iter().filter_map(|p| p.coordinate));
    let batch = matcher.route_all(ctx, origin, &groups.destinations).await;

    let mut membership = groups.membership.into_iter();
    postings
        .into_iter()
        .map(|posting| {
            let Some(coordinate) = posting.coordinate else {
                return without_commute(posting);
            };
            let route = membership.next().and_then(|group| batch.routes[group]);
            PostingWithCommute {
                straight_line_distance_km: Some(round_km(haversine_km(origin, coordinate))),
                commute_distance_km: route.map(|r| round_km(r.distance_km())),
                commute_duration_minutes: route.map(|r| r.duration_minutes),
                posting,
            }
        })
        .collect()
}

fn without_commute(posting: JobPosting) -> PostingWithCommute {
    PostingWithCommute {
        posting,
        straight_line_distance_km: None,
        commute_distance_km: None,
        commute_duration_minutes: None,
    }
}

fn normalized(filter: Option<&str>) -> Option<String> {
    filter
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

fn contains(field: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |needle| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmploymentType, GenderRequirement, HiringDetails, RouteResult};
    use crate::services::{ProviderError, RouteProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Every destination is 2 km and 9 minutes away, except the unroutable one
    struct FlatRoutes {
        unroutable: Option<Coordinate>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RouteProvider for FlatRoutes {
        async fn route(&self, _origin: Coordinate, destination: Coordinate) -> Result<RouteResult, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(destination) == self.unroutable {
                return Err(ProviderError::Unresolved("no bicycling path".to_string()));
            }
            Ok(RouteResult::from_seconds(2_000, 540))
        }
    }

    fn create_matcher(unroutable: Option<Coordinate>) -> (JobMatcher, Arc<FlatRoutes>) {
        let routes = Arc::new(FlatRoutes {
            unroutable,
            calls: AtomicUsize::new(0),
        });
        (JobMatcher::with_defaults(routes.clone()), routes)
    }

    fn origin() -> Coordinate {
        Coordinate::new(116.40, 39.90).unwrap()
    }

    fn create_posting(id: i64, job_type: &str, employer: &str, site: &str, lon: f64) -> JobPosting {
        JobPosting {
            id,
            job_type: job_type.to_string(),
            employer_name: employer.to_string(),
            city: Some("Beijing".to_string()),
            location_name: Some(site.to_string()),
            coordinate: Some(Coordinate::new(lon, 39.90).unwrap()),
            gender_requirement: GenderRequirement::Any,
            employment_type: EmploymentType::FullTime,
            currently_recruiting: true,
            salary: None,
            working_hours: None,
            age_requirement: None,
            job_content: None,
            details: HiringDetails::default(),
        }
    }

    fn create_pool() -> Vec<JobPosting> {
        let mut closed = create_posting(4, "driver", "Fresh Mart", "Chaoyang Hub", 116.41);
        closed.currently_recruiting = false;
        vec![
            create_posting(1, "picker", "Fresh Mart", "Chaoyang Hub", 116.41),
            create_posting(2, "packer", "Fresh Mart", "Chaoyang Hub", 116.41),
            create_posting(3, "sorter", "Fresh Mart", "Chaoyang Hub", 116.41),
            closed,
            create_posting(5, "packer", "Fresh Mart", "Chaoyang Hub", 116.41),
            create_posting(6, "courier", "City Express", "Haidian Depot", 116.30),
            create_posting(7, "picker", "City Express", "Chaoyang Hub", 116.45),
        ]
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Duration::from_secs(30))
    }

    #[test]
    fn test_search_locations_by_name() {
        let pool = vec![
            Location {
                id: 1,
                name: "Wangjing North Station".to_string(),
                address: None,
                coordinate: Some(origin()),
                contact_person: None,
                contact_phone: None,
                site_info: None,
                demand_summary: vec![],
            },
            Location {
                id: 2,
                name: "Sanlitun Station".to_string(),
                address: None,
                coordinate: None,
                contact_person: None,
                contact_phone: None,
                site_info: None,
                demand_summary: vec![],
            },
        ];

        let found = search_locations_by_name(&pool, "wangjing");
        assert_eq!(found.len(), 1);
        assert!(found[0].map_url.as_deref().unwrap().starts_with("https://uri.amap.com/marker"));

        let found = search_locations_by_name(&pool, "station");
        assert_eq!(found.len(), 2);
        assert!(found[1].map_url.is_none());
    }

    #[test]
    fn test_other_jobs_at_same_location() {
        let pool = create_pool();
        let others = other_jobs_at_same_location(&pool[0], &pool);

        // Same employer and site, recruiting, distinct and sorted
        assert_eq!(others, vec!["packer".to_string(), "sorter".to_string()]);
    }

    #[test]
    fn test_interview_information() {
        let mut posting = create_posting(9, "picker", "Fresh Mart", "Chaoyang Hub", 116.41);
        assert!(interview_information(&posting).interview_time.is_none());

        posting.details.interview_time = Some("Tue/Thu 14:00".to_string());
        let info = interview_information(&posting);
        assert_eq!(info.job_id, 9);
        assert_eq!(info.employer_name, "Fresh Mart");
        assert_eq!(info.interview_time.as_deref(), Some("Tue/Thu 14:00"));
    }

    #[test]
    fn test_other_jobs_without_location_name() {
        let mut posting = create_pool().remove(0);
        posting.location_name = None;
        assert!(other_jobs_at_same_location(&posting, &create_pool()).is_empty());
    }

    #[tokio::test]
    async fn test_job_detail_with_origin() {
        let (matcher, routes) = create_matcher(None);
        let pool = create_pool();

        let detail = job_detail(&matcher, &ctx(), pool[0].clone(), &pool, Some(origin())).await;

        assert_eq!(detail.job.commute_distance_km, Some(2.0));
        assert_eq!(detail.job.commute_duration_minutes, Some(9));
        assert!(detail.job.straight_line_distance_km.unwrap() > 0.0);
        assert_eq!(detail.other_jobs_at_same_location.len(), 2);
        assert_eq!(routes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_job_detail_routing_failure_is_not_an_error() {
        let pool = create_pool();
        let (matcher, _) = create_matcher(pool[0].coordinate);

        let detail = job_detail(&matcher, &ctx(), pool[0].clone(), &pool, Some(origin())).await;

        assert!(detail.job.straight_line_distance_km.is_some());
        assert!(detail.job.commute_distance_km.is_none());
        assert!(detail.job.commute_duration_minutes.is_none());
    }

    #[tokio::test]
    async fn test_search_jobs_requires_a_filter() {
        let (matcher, _) = create_matcher(None);
        let search = JobSearch {
            employer_name: Some("  ".to_string()),
            k: 100,
            ..Default::default()
        };

        let result = search_jobs(&matcher, &ctx(), &create_pool(), &search).await;
        assert!(matches!(result, Err(MatchError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_search_jobs_without_origin_sorted_by_type() {
        let (matcher, routes) = create_matcher(None);
        let search = JobSearch {
            employer_name: Some("fresh".to_string()),
            k: 100,
            ..Default::default()
        };

        let found = search_jobs(&matcher, &ctx(), &create_pool(), &search).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.posting.id).collect();

        assert_eq!(ids, vec![2, 5, 1, 3]);
        assert!(found.iter().all(|p| p.commute_duration_minutes.is_none()));
        assert_eq!(routes.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_jobs_with_origin_nearest_first() {
        let pool = create_pool();
        let (matcher, routes) = create_matcher(pool[6].coordinate);
        let search = JobSearch {
            job_type: Some("PICK".to_string()),
            origin: Some(origin()),
            k: 100,
            ..Default::default()
        };

        let found = search_jobs(&matcher, &ctx(), &pool, &search).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.posting.id).collect();

        assert_eq!(ids, vec![1, 7]);
        assert_eq!(found[0].commute_duration_minutes, Some(9));
        // Unroutable site keeps the posting with empty commute fields
        assert!(found[1].commute_distance_km.is_none());
        assert!(found[1].straight_line_distance_km.is_some());
        assert_eq!(routes.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_jobs_truncates_to_k() {
        let (matcher, routes) = create_matcher(None);
        let search = JobSearch {
            employer_name: Some("Fresh Mart".to_string()),
            origin: Some(origin()),
            k: 2,
            ..Default::default()
        };

        let found = search_jobs(&matcher, &ctx(), &create_pool(), &search).await.unwrap();

        assert_eq!(found.len(), 2);
        // Both share one site, so a single routing call serves them
        assert_eq!(routes.calls.load(Ordering::SeqCst), 1);
    }
}
