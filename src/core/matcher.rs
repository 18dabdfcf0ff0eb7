use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::context::RequestContext;
use crate::core::distance::round_km;
use crate::core::filters::{eligible_postings, EligiblePosting};
use crate::models::{CandidateQuery, Coordinate, JobPosting, RankedPosting, RouteResult};
use crate::services::amap::navigation_url;
use crate::services::{ProviderError, RouteProvider};

/// Upper bound on concurrent routing calls per request
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Straight-line pre-filter radius as a multiple of the commute limit
pub const DEFAULT_STRAIGHT_LINE_FACTOR: f64 = 1.5;

/// Result of the matching process
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub postings: Vec<RankedPosting>,
    pub eligible_count: usize,
    pub location_count: usize,
    pub failed_locations: usize,
    pub deadline_exceeded: bool,
}

/// Distinct destinations and, for every input, the index of its destination
#[derive(Debug, Default, PartialEq)]
pub struct LocationGroups {
    pub destinations: Vec<Coordinate>,
    pub membership: Vec<usize>,
}

/// Group coordinates by exact location key, in first-seen order
pub fn group_by_location<I>(coordinates: I) -> LocationGroups
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut groups = LocationGroups::default();

    for coordinate in coordinates {
        let next = groups.destinations.len();
        let index = *index_by_key.entry(coordinate.location_key()).or_insert(next);
        if index == next {
            groups.destinations.push(coordinate);
        }
        groups.membership.push(index);
    }

    groups
}

/// Routes for a batch of destinations, indexed like the input
#[derive(Debug, Default)]
pub struct RouteBatch {
    pub routes: Vec<Option<RouteResult>>,
    pub deadline_exceeded: bool,
}

impl RouteBatch {
    pub fn failed(&self) -> usize {
        self.routes.iter().filter(|route| route.is_none()).count()
    }
}

/// Commute-time ranking of job postings for one candidate
///
/// # Pipeline Stages
/// 1. Eligibility filter (recruiting, gender, employment type, straight-line radius)
/// 2. Group postings that share a location
/// 3. One routing call per location on a bounded worker pool
/// 4. Drop locations beyond the commute limit
/// 5. Stable sort by commute duration
#[derive(Clone)]
pub struct JobMatcher {
    routes: Arc<dyn RouteProvider>,
    max_workers: usize,
    straight_line_factor: f64,
}

impl JobMatcher {
    pub fn new(routes: Arc<dyn RouteProvider>, max_workers: usize, straight_line_factor: f64) -> Self {
        Self {
            routes,
            max_workers: max_workers.max(1),
            straight_line_factor,
        }
    }

    pub fn with_defaults(routes: Arc<dyn RouteProvider>) -> Self {
        Self::new(routes, DEFAULT_MAX_WORKERS, DEFAULT_STRAIGHT_LINE_FACTOR)
    }

    pub fn straight_line_factor(&self) -> f64 {
        self.straight_line_factor
    }

    /// Rank the postings a candidate can reach within their commute limit
    ///
    /// Locations whose routing fails, or that are still pending when the
    /// request deadline passes, are dropped and counted in `failed_locations`.
    pub async fn match_jobs(
        &self,
        ctx: &RequestContext,
        query: &CandidateQuery,
        postings: &[JobPosting],
    ) -> MatchOutcome {
        let eligible = eligible_postings(query, postings, self.straight_line_factor);
        let eligible_count = eligible.len();

        let groups = group_by_location(eligible.iter().filter_map(|e| e.posting.coordinate));
        let location_count = groups.destinations.len();

        tracing::debug!(
            "{} of {} postings eligible across {} locations",
            eligible_count,
            postings.len(),
            location_count
        );

        if location_count == 0 {
            return MatchOutcome {
                eligible_count,
                ..Default::default()
            };
        }

        let batch = self.route_all(ctx, query.origin, &groups.destinations).await;
        let failed_locations = batch.failed();

        let mut ranked: Vec<RankedPosting> = eligible
            .into_iter()
            .zip(groups.membership.iter())
            .filter_map(|(eligible, &group)| {
                let route = batch.routes[group]?;
                (route.distance_km() <= query.max_commute_distance_km)
                    .then(|| ranked_posting(eligible, route))
            })
            .collect();

        // Stable: equal durations keep eligibility order
        ranked.sort_by_key(|posting| posting.commute_duration_minutes);

        tracing::info!(
            "Matched {} postings ({} eligible, {} locations, {} failed{})",
            ranked.len(),
            eligible_count,
            location_count,
            failed_locations,
            if batch.deadline_exceeded { ", deadline exceeded" } else { "" }
        );

        MatchOutcome {
            postings: ranked,
            eligible_count,
            location_count,
            failed_locations,
            deadline_exceeded: batch.deadline_exceeded,
        }
    }

    /// Route from `origin` to every destination on the bounded worker pool
    ///
    /// Results are collected in full before returning and indexed by
    /// destination, so completion order never matters. Work still pending at
    /// the deadline is aborted and left as `None`.
    pub async fn route_all(
        &self,
        ctx: &RequestContext,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> RouteBatch {
        let mut batch = RouteBatch {
            routes: vec![None; destinations.len()],
            deadline_exceeded: false,
        };
        if destinations.is_empty() {
            return batch;
        }

        let workers = self.max_workers.min(destinations.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        for (index, destination) in destinations.iter().copied().enumerate() {
            let routes = Arc::clone(&self.routes);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => routes.route(origin, destination).await,
                    Err(_) => Err(ProviderError::Unavailable {
                        attempts: 0,
                        reason: "worker pool closed".to_string(),
                    }),
                };
                (index, destination, result)
            });
        }

        loop {
            match tokio::time::timeout_at(ctx.deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, _, Ok(route))))) => batch.routes[index] = Some(route),
                Ok(Some(Ok((_, destination, Err(e))))) => {
                    tracing::warn!("Routing to {} failed: {}", destination, e);
                }
                Ok(Some(Err(e))) => tracing::warn!("Routing task failed: {}", e),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Request {} deadline reached with {} routing calls pending",
                        ctx.request_id,
                        tasks.len()
                    );
                    tasks.abort_all();
                    batch.deadline_exceeded = true;
                    break;
                }
            }
        }

        batch
    }
}

fn ranked_posting(eligible: EligiblePosting, route: RouteResult) -> RankedPosting {
    let navigation_url = eligible.posting.coordinate.map(|coordinate| {
        let name = eligible
            .posting
            .location_name
            .as_deref()
            .unwrap_or(&eligible.posting.employer_name);
        navigation_url(coordinate, name)
    });

    RankedPosting {
        straight_line_distance_km: round_km(eligible.straight_line_km),
        commute_distance_km: round_km(route.distance_km()),
        commute_duration_minutes: route.duration_minutes,
        navigation_url,
        posting: eligible.posting,
    }
}
