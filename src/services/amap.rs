use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::{Coordinate, RouteResult};
use crate::services::provider::{Geocoder, ProviderError, RouteProvider};
use crate::services::retry::{AttemptError, RetryPolicy};

/// Provider messages that mean "slow down", not "no result"
const QUOTA_MARKERS: &[&str] = &[
    "CUQPS_HAS_EXCEEDED_THE_LIMIT",
    "CKQPS_HAS_EXCEEDED_THE_LIMIT",
    "ACCESS_TOO_FREQUENT",
    "DAILY_QUERY_OVER_LIMIT",
];

const GEOCODE_PATH: &str = "v3/geocode/geo";
const BICYCLING_PATH: &str = "v4/direction/bicycling";

/// AMap web-service client
///
/// Implements both [`Geocoder`] and [`RouteProvider`]. Each call goes through
/// [`RetryPolicy::run`]; quota responses and transport errors are retried,
/// "no result" responses are not.
pub struct AmapClient {
    base_url: String,
    api_key: String,
    client: Client,
    geocode_policy: RetryPolicy,
    route_policy: RetryPolicy,
}

impl AmapClient {
    /// Create a new client with default retry policies
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            geocode_policy: RetryPolicy::geocoding_default(),
            route_policy: RetryPolicy::routing_default(),
        })
    }

    pub fn with_retry_policies(mut self, geocoding: RetryPolicy, routing: RetryPolicy) -> Self {
        self.geocode_policy = geocoding;
        self.route_policy = routing;
        self
    }

    /// GET a provider endpoint under `policy`
    ///
    /// `quota_message` returns the provider's message when the body is a quota
    /// error; `parse` turns any other body into a value or a fatal error.
    async fn request_json<T, Q, P>(
        &self,
        policy: &RetryPolicy,
        operation: &str,
        path: &str,
        params: &[(&str, String)],
        quota_message: Q,
        parse: P,
    ) -> Result<T, ProviderError>
    where
        Q: Fn(&Value) -> Option<String>,
        P: Fn(Value) -> Result<T, ProviderError>,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut query: Vec<(&str, String)> = vec![("key", self.api_key.clone())];
        query.extend(params.iter().cloned());

        let (url, query, quota_message, parse) = (&url, &query, &quota_message, &parse);

        policy
            .run(operation, move |attempt| {
                tracing::debug!("{} attempt {}: GET {}", operation, attempt, url);
                self.attempt_json(url, query, quota_message, parse)
            })
            .await
    }

    /// One HTTP round trip, classified for the retry loop
    async fn attempt_json<T, Q, P>(
        &self,
        url: &str,
        query: &[(&str, String)],
        quota_message: &Q,
        parse: &P,
    ) -> Result<T, AttemptError>
    where
        Q: Fn(&Value) -> Option<String>,
        P: Fn(Value) -> Result<T, ProviderError>,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Transport(format!("HTTP {}", status)));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                AttemptError::Fatal(ProviderError::InvalidResponse(e.to_string()))
            } else {
                AttemptError::Transport(e.to_string())
            }
        })?;

        if let Some(message) = quota_message(&body) {
            return Err(AttemptError::Quota(message));
        }

        parse(body).map_err(AttemptError::Fatal)
    }
}

#[async_trait]
impl Geocoder for AmapClient {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ProviderError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ProviderError::Unresolved("empty address".to_string()));
        }

        let params = [("address", address.to_string()), ("output", "json".to_string())];
        let coordinate = self
            .request_json(
                &self.geocode_policy,
                "geocode",
                GEOCODE_PATH,
                &params,
                |body| quota_in(body, "status", "1", &["info", "infocode"]),
                parse_geocode,
            )
            .await?;

        tracing::debug!("Geocoded '{}' to {}", address, coordinate);
        Ok(coordinate)
    }
}

#[async_trait]
impl RouteProvider for AmapClient {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteResult, ProviderError> {
        let params = [
            ("origin", origin.to_param()),
            ("destination", destination.to_param()),
        ];

        self.request_json(
            &self.route_policy,
            "bicycling route",
            BICYCLING_PATH,
            &params,
            |body| quota_in(body, "errcode", "0", &["errmsg", "errdetail"]),
            parse_bicycling,
        )
        .await
    }
}

/// Quota message if the status field is not the success value and any of the
/// message fields carries a quota marker
fn quota_in(body: &Value, status_field: &str, ok_value: &str, message_fields: &[&str]) -> Option<String> {
    if body.get(status_field).map(scalar_text).as_deref() == Some(ok_value) {
        return None;
    }

    message_fields
        .iter()
        .filter_map(|field| body.get(*field).map(scalar_text))
        .find(|message| QUOTA_MARKERS.iter().any(|marker| message.contains(marker)))
}

fn parse_geocode(body: Value) -> Result<Coordinate, ProviderError> {
    if body.get("status").map(scalar_text).as_deref() != Some("1") {
        let info = body.get("info").map(scalar_text).unwrap_or_else(|| "unknown error".to_string());
        return Err(ProviderError::Unresolved(info));
    }

    let location = body
        .get("geocodes")
        .and_then(Value::as_array)
        .and_then(|geocodes| geocodes.first())
        .and_then(|geocode| geocode.get("location"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Unresolved("no geocode match".to_string()))?;

    let (lon, lat) = location
        .split_once(',')
        .ok_or_else(|| ProviderError::InvalidResponse(format!("malformed location '{}'", location)))?;

    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("malformed longitude '{}'", lon)))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("malformed latitude '{}'", lat)))?;

    Coordinate::new(longitude, latitude).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

fn parse_bicycling(body: Value) -> Result<RouteResult, ProviderError> {
    if body.get("errcode").map(scalar_text).as_deref() != Some("0") {
        let message = body
            .get("errmsg")
            .map(scalar_text)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ProviderError::Unresolved(message));
    }

    let path = body
        .pointer("/data/paths/0")
        .ok_or_else(|| ProviderError::Unresolved("no route found".to_string()))?;

    let distance = path
        .get("distance")
        .and_then(as_number)
        .ok_or_else(|| ProviderError::InvalidResponse("missing route distance".to_string()))?;
    let duration = path
        .get("duration")
        .and_then(as_number)
        .ok_or_else(|| ProviderError::InvalidResponse("missing route duration".to_string()))?;

    Ok(RouteResult::from_seconds(distance, duration))
}

/// Provider scalars arrive as numbers or numeric strings
fn as_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Map marker link for a site
pub fn marker_url(coordinate: Coordinate, name: &str) -> String {
    let mut url = format!("https://uri.amap.com/marker?position={}", coordinate.to_param());
    if !name.is_empty() {
        url.push_str("&name=");
        url.push_str(&urlencoding::encode(name));
    }
    url
}

/// Bicycle navigation link to a site
pub fn navigation_url(coordinate: Coordinate, name: &str) -> String {
    let mut url = format!("https://uri.amap.com/navigation?to={}", coordinate.to_param());
    if !name.is_empty() {
        url.push(',');
        url.push_str(&urlencoding::encode(name));
    }
    url.push_str("&mode=ride&policy=1");
    url
}
