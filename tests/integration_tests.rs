// Integration tests for Commute Match

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use commute_match::core::{JobMatcher, RequestContext};
use commute_match::error::MatchError;
use commute_match::models::{
    CandidateQuery, Coordinate, EmploymentType, GenderRequirement, HiringDetails, JobPosting,
};
use commute_match::services::{AmapClient, BackoffStrategy, Geocoder, ProviderError, RetryPolicy};
use mockito::{Matcher, Mock, ServerGuard};
use std::sync::Arc;
use std::time::Duration;

const ORIGIN: (f64, f64) = (116.478346, 39.997361);

fn coord(lon: f64, lat: f64) -> Coordinate {
    Coordinate::new(lon, lat).unwrap()
}

fn origin() -> Coordinate {
    coord(ORIGIN.0, ORIGIN.1)
}

fn create_client(server: &ServerGuard) -> AmapClient {
    let fast = |attempts| RetryPolicy::new(attempts, Duration::ZERO, BackoffStrategy::Fixed);
    AmapClient::new(server.url(), "test_key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_retry_policies(fast(5), fast(3))
}

fn create_posting(id: i64, job_type: &str, site: Coordinate) -> JobPosting {
    JobPosting {
        id,
        job_type: job_type.to_string(),
        employer_name: "Fresh Mart".to_string(),
        city: Some("Beijing".to_string()),
        location_name: Some(format!("Site {}", site)),
        coordinate: Some(site),
        gender_requirement: GenderRequirement::Any,
        employment_type: EmploymentType::FullTime,
        currently_recruiting: true,
        salary: Some("6000-8000".to_string()),
        working_hours: None,
        age_requirement: None,
        job_content: None,
        details: HiringDetails::default(),
    }
}

fn create_query(max_km: f64) -> CandidateQuery {
    CandidateQuery {
        origin: origin(),
        gender_filter: GenderRequirement::Female,
        employment_type_filter: EmploymentType::FullTime,
        max_commute_distance_km: max_km,
    }
}

async fn mock_route(server: &mut ServerGuard, destination: Coordinate, body: String, hits: usize) -> Mock {
    server
        .mock("GET", "/v4/direction/bicycling")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("origin".into(), origin().location_key()),
            Matcher::UrlEncoded("destination".into(), destination.location_key()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

fn route_body(meters: u64, seconds: u64) -> String {
    format!(
        r#"{{"errcode":0,"errmsg":"OK","data":{{"paths":[{{"distance":{},"duration":{}}}]}}}}"#,
        meters, seconds
    )
}

#[tokio::test]
async fn test_integration_end_to_end_matching() {
    let mut server = mockito::Server::new_async().await;

    // X: ~3.6 km straight line, 5 km by bicycle. Y: ~7 km straight line, 12 km by bicycle.
    let x = coord(116.52, ORIGIN.1);
    let y = coord(116.56, ORIGIN.1);
    let x_mock = mock_route(&mut server, x, route_body(5_000, 1_200), 1).await;
    let y_mock = mock_route(&mut server, y, route_body(12_000, 2_700), 1).await;

    let matcher = JobMatcher::with_defaults(Arc::new(create_client(&server)));
    let postings = vec![
        create_posting(1, "picker", x),
        create_posting(2, "picker", y),
        create_posting(3, "packer", x),
        create_posting(4, "sorter", y),
        create_posting(5, "driver", x),
    ];

    let ctx = RequestContext::new(Duration::from_secs(30));
    let outcome = matcher.match_jobs(&ctx, &create_query(8.0), &postings).await;

    let ids: Vec<i64> = outcome.postings.iter().map(|p| p.posting.id).collect();
    assert_eq!(ids, vec![1, 3, 5]);
    assert_eq!(outcome.location_count, 2);
    assert_eq!(outcome.failed_locations, 0);

    // Shared location: identical metrics
    for posting in &outcome.postings {
        assert_eq!(posting.commute_distance_km, 5.0);
        assert_eq!(posting.commute_duration_minutes, 20);
    }

    // One routing call per location, not per posting
    x_mock.assert_async().await;
    y_mock.assert_async().await;
}

#[tokio::test]
async fn test_integration_rate_limited_location_is_dropped() {
    let mut server = mockito::Server::new_async().await;

    let near = coord(116.49, ORIGIN.1);
    let busy = coord(116.50, ORIGIN.1);
    let near_mock = mock_route(&mut server, near, route_body(1_400, 400), 1).await;
    let busy_mock = mock_route(
        &mut server,
        busy,
        r#"{"errcode":10021,"errmsg":"CUQPS_HAS_EXCEEDED_THE_LIMIT"}"#.to_string(),
        3,
    )
    .await;

    let matcher = JobMatcher::with_defaults(Arc::new(create_client(&server)));
    let postings = vec![create_posting(1, "picker", busy), create_posting(2, "picker", near)];

    let ctx = RequestContext::new(Duration::from_secs(30));
    let outcome = matcher.match_jobs(&ctx, &create_query(5.0), &postings).await;

    assert_eq!(outcome.postings.len(), 1);
    assert_eq!(outcome.postings[0].posting.id, 2);
    assert_eq!(outcome.postings[0].commute_duration_minutes, 7);
    assert_eq!(outcome.failed_locations, 1);

    near_mock.assert_async().await;
    busy_mock.assert_async().await;
}

#[tokio::test]
async fn test_integration_results_sorted_by_duration() {
    let mut server = mockito::Server::new_async().await;

    let sites = [
        (coord(116.49, ORIGIN.1), 1_500, 900),
        (coord(116.50, ORIGIN.1), 2_000, 300),
        (coord(116.51, ORIGIN.1), 3_000, 600),
    ];
    let mut mocks = Vec::new();
    for (site, meters, seconds) in sites {
        mocks.push(mock_route(&mut server, site, route_body(meters, seconds), 1).await);
    }

    let matcher = JobMatcher::with_defaults(Arc::new(create_client(&server)));
    let postings: Vec<JobPosting> = sites
        .iter()
        .enumerate()
        .map(|(i, (site, _, _))| create_posting(i as i64, "picker", *site))
        .collect();

    let ctx = RequestContext::new(Duration::from_secs(30));
    let outcome = matcher.match_jobs(&ctx, &create_query(5.0), &postings).await;

    let durations: Vec<u32> = outcome.postings.iter().map(|p| p.commute_duration_minutes).collect();
    assert_eq!(durations, vec![5, 10, 15]);

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_integration_geocode_quota_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;

    let quota = server
        .mock("GET", "/v3/geocode/geo")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"0","info":"CUQPS_HAS_EXCEEDED_THE_LIMIT","infocode":"10019"}"#)
        .expect(5)
        .create_async()
        .await;

    let address = "北京市朝阳区望京";
    let err = create_client(&server).geocode(address).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { attempts: 5 }));

    let err = MatchError::from_geocode(address, err);
    assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    quota.assert_async().await;
}

#[tokio::test]
async fn test_integration_geocode_resolves_address() {
    let mut server = mockito::Server::new_async().await;

    let geocode = server
        .mock("GET", "/v3/geocode/geo")
        .match_query(Matcher::UrlEncoded("address".into(), "北京市朝阳区望京".into()))
        .with_status(200)
        .with_body(r#"{"status":"1","info":"OK","geocodes":[{"location":"116.478346,39.997361"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let coordinate = create_client(&server).geocode("北京市朝阳区望京").await.unwrap();
    assert_eq!(coordinate, origin());
    geocode.assert_async().await;
}
