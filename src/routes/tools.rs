use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use validator::Validate;

use crate::core::{
    haversine_km, interview_information, job_detail, round_km, search_jobs,
    search_locations_by_name, JobMatcher, JobSearch, NearestLocationFinder, RequestContext,
};
use crate::error::MatchError;
use crate::models::{
    CandidateQuery, ComputeDistanceRequest, ComputeDistanceResponse, Coordinate,
    FindNearestRequest, FindNearestResponse, GeocodeRequest, HealthResponse, JobLookupQuery,
    LocationCountResponse, LocationSearchQuery, LocationSearchResponse, MatchJobsRequest,
    MatchJobsResponse,
    SearchJobsRequest, SearchJobsResponse,
};
use crate::services::{Geocoder, Repository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub geocoder: Arc<dyn Geocoder>,
    pub matcher: JobMatcher,
    pub finder: NearestLocationFinder,
    pub request_timeout: Duration,
    pub default_k: usize,
    pub max_k: usize,
}

impl AppState {
    fn context(&self) -> RequestContext {
        RequestContext::new(self.request_timeout)
    }

    async fn geocode(&self, ctx: &RequestContext, address: &str) -> Result<Coordinate, MatchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(MatchError::InvalidInput("address must not be blank".to_string()));
        }

        ctx.run(async {
            self.geocoder
                .geocode(address)
                .await
                .map_err(|e| MatchError::from_geocode(address, e))
        })
        .await
    }
}

/// Configure all tool routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/tools/find_nearest_locations", web::post().to(find_nearest_locations))
        .route("/tools/match_jobs", web::post().to(match_jobs))
        .route("/tools/compute_distance", web::post().to(compute_distance))
        .route("/tools/geocode", web::post().to(geocode))
        .route("/tools/search_jobs", web::post().to(search_jobs_tool))
        .route("/locations/search", web::get().to(search_locations))
        .route("/locations/count", web::get().to(count_locations))
        .route("/jobs/{id}", web::get().to(get_job))
        .route("/jobs/{id}/interview", web::get().to(get_interview_information));
}

fn request_span(ctx: &RequestContext, tool: &'static str) -> tracing::Span {
    tracing::info_span!("tool", tool, request_id = %ctx.request_id)
}

fn validate<T: Validate>(req: &T) -> Result<(), MatchError> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed: {}", errors);
        MatchError::InvalidInput(errors.to_string())
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = state.repository.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        store: if store_healthy { "up" } else { "down" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Nearest locations with open demand
///
/// POST /api/v1/tools/find_nearest_locations
///
/// Request body:
/// ```json
/// {
///   "origin": {"longitude": 116.478, "latitude": 39.997},
///   "k": 3
/// }
/// ```
/// `address` may replace `origin`; supplying both, or neither, is rejected.
async fn find_nearest_locations(
    state: web::Data<AppState>,
    req: web::Json<FindNearestRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;
    let k = req.k.unwrap_or(state.default_k);
    if k > state.max_k {
        return Err(MatchError::InvalidInput(format!("k must be at most {}", state.max_k)));
    }

    let ctx = state.context();
    let span = request_span(&ctx, "find_nearest_locations");

    let origin = match (req.origin, req.address.as_deref()) {
        (Some(origin), None) => origin,
        (None, Some(address)) => state.geocode(&ctx, address).instrument(span.clone()).await?,
        _ => {
            return Err(MatchError::InvalidInput(
                "exactly one of origin or address is required".to_string(),
            ))
        }
    };

    let pool = state.repository.load_locations().await?;
    let locations = span.in_scope(|| state.finder.find_nearest(origin, &pool, k));

    let response = FindNearestResponse {
        origin,
        partial: locations.len() < k,
        requested: k,
        locations,
    };

    span.in_scope(|| {
        tracing::info!(
            "Returning {} of {} requested locations near {}",
            response.locations.len(),
            k,
            origin
        )
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Rank job postings by commute time
///
/// POST /api/v1/tools/match_jobs
///
/// Request body:
/// ```json
/// {
///   "origin": {"longitude": 116.478, "latitude": 39.997},
///   "gender": "female",
///   "employmentType": "fullTime",
///   "maxCommuteDistanceKm": 5.0
/// }
/// ```
async fn match_jobs(
    state: web::Data<AppState>,
    req: web::Json<MatchJobsRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;

    let ctx = state.context();
    let query = CandidateQuery {
        origin: req.origin,
        gender_filter: req.gender,
        employment_type_filter: req.employment_type,
        max_commute_distance_km: req.max_commute_distance_km,
    };

    let postings = state.repository.load_postings().await?;
    let outcome = state
        .matcher
        .match_jobs(&ctx, &query, &postings)
        .instrument(request_span(&ctx, "match_jobs"))
        .await;

    Ok(HttpResponse::Ok().json(MatchJobsResponse {
        request_id: ctx.request_id.to_string(),
        postings: outcome.postings,
        eligible_count: outcome.eligible_count,
        location_count: outcome.location_count,
        failed_locations: outcome.failed_locations,
        deadline_exceeded: outcome.deadline_exceeded,
    }))
}

/// POST /api/v1/tools/compute_distance
async fn compute_distance(req: web::Json<ComputeDistanceRequest>) -> HttpResponse {
    HttpResponse::Ok().json(ComputeDistanceResponse {
        distance_km: round_km(haversine_km(req.from, req.to)),
    })
}

/// POST /api/v1/tools/geocode
async fn geocode(
    state: web::Data<AppState>,
    req: web::Json<GeocodeRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;

    let ctx = state.context();
    let coordinate = state
        .geocode(&ctx, &req.address)
        .instrument(request_span(&ctx, "geocode"))
        .await?;

    Ok(HttpResponse::Ok().json(coordinate))
}

/// GET /api/v1/locations/search?name=wangjing
async fn search_locations(
    state: web::Data<AppState>,
    query: web::Query<LocationSearchQuery>,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;

    let pool = state.repository.load_locations().await?;
    let locations = search_locations_by_name(&pool, &query.name);

    tracing::debug!("Location search '{}' matched {}", query.name, locations.len());

    Ok(HttpResponse::Ok().json(LocationSearchResponse {
        total_results: locations.len(),
        locations,
    }))
}

/// GET /api/v1/locations/count
async fn count_locations(state: web::Data<AppState>) -> Result<HttpResponse, MatchError> {
    let total_locations = state.repository.count_locations().await?;

    Ok(HttpResponse::Ok().json(LocationCountResponse { total_locations }))
}

/// Job detail, with commute metrics when the candidate position is given
///
/// GET /api/v1/jobs/{id}?longitude=116.478&latitude=39.997
async fn get_job(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<JobLookupQuery>,
) -> Result<HttpResponse, MatchError> {
    let id = path.into_inner();
    let origin = match (query.longitude, query.latitude) {
        (Some(longitude), Some(latitude)) => Some(Coordinate::new(longitude, latitude)?),
        (None, None) => None,
        _ => {
            return Err(MatchError::InvalidInput(
                "longitude and latitude must be given together".to_string(),
            ))
        }
    };

    let posting = state
        .repository
        .find_posting(id)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("job {}", id)))?;
    let pool = state.repository.load_postings().await?;

    let ctx = state.context();
    let detail = job_detail(&state.matcher, &ctx, posting, &pool, origin)
        .instrument(request_span(&ctx, "get_job"))
        .await;

    Ok(HttpResponse::Ok().json(detail))
}

/// GET /api/v1/jobs/{id}/interview
async fn get_interview_information(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, MatchError> {
    let id = path.into_inner();
    let posting = state
        .repository
        .find_posting(id)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("job {}", id)))?;

    Ok(HttpResponse::Ok().json(interview_information(&posting)))
}

/// Search postings by employer and/or job type
///
/// POST /api/v1/tools/search_jobs
///
/// Request body:
/// ```json
/// {
///   "employerName": "fresh",
///   "jobType": "picker",
///   "origin": {"longitude": 116.478, "latitude": 39.997},
///   "k": 100
/// }
/// ```
async fn search_jobs_tool(
    state: web::Data<AppState>,
    req: web::Json<SearchJobsRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;

    let ctx = state.context();
    let search = JobSearch {
        employer_name: req.employer_name.clone(),
        job_type: req.job_type.clone(),
        origin: req.origin,
        k: req.k,
    };

    let pool = state.repository.load_postings().await?;
    let postings = search_jobs(&state.matcher, &ctx, &pool, &search)
        .instrument(request_span(&ctx, "search_jobs"))
        .await?;

    Ok(HttpResponse::Ok().json(SearchJobsResponse {
        total_results: postings.len(),
        postings,
    }))
}
