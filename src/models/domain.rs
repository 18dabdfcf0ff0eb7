use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MatchError;

/// A point in decimal degrees, longitude first.
///
/// Longitude/latitude use the map provider's datum as-is; nothing in this
/// crate converts between WGS84 and GCJ-02.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRepr")]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Deserialize)]
struct CoordinateRepr {
    longitude: f64,
    latitude: f64,
}

impl TryFrom<CoordinateRepr> for Coordinate {
    type Error = MatchError;

    fn try_from(repr: CoordinateRepr) -> Result<Self, Self::Error> {
        Coordinate::new(repr.longitude, repr.latitude)
    }
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, MatchError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(MatchError::InvalidInput(format!(
                "coordinate must be finite, got ({}, {})",
                longitude, latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(MatchError::InvalidInput(format!(
                "coordinate out of range: ({}, {})",
                longitude, latitude
            )));
        }
        Ok(Self { longitude, latitude })
    }

    /// Exact-match grouping key, `"{lon},{lat}"`
    pub fn location_key(&self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }

    /// Provider wire format, same as the key
    pub fn to_param(&self) -> String {
        self.location_key()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// One labelled opening on a location, e.g. `("picker", "3")`
///
/// The quantity is kept as the raw text from the store; see
/// [`DemandEntry::open_quantity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEntry {
    pub label: String,
    pub quantity: String,
}

impl DemandEntry {
    pub fn new(label: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            quantity: quantity.into(),
        }
    }

    /// Headcount if the quantity parses as a finite positive number
    pub fn open_quantity(&self) -> Option<f64> {
        self.quantity
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|q| q.is_finite() && *q > 0.0)
    }
}

/// A physical service site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub site_info: Option<String>,
    #[serde(default)]
    pub demand_summary: Vec<DemandEntry>,
}

/// Gender requirement on a posting, or the candidate's filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderRequirement {
    #[serde(alias = "男")]
    Male,
    #[serde(alias = "女")]
    Female,
    #[serde(alias = "不限")]
    Any,
}

impl GenderRequirement {
    /// Map a free-form store label; anything unrecognised means no requirement
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("男") => GenderRequirement::Male,
            Some("女") => GenderRequirement::Female,
            Some(other) if other.eq_ignore_ascii_case("male") => GenderRequirement::Male,
            Some(other) if other.eq_ignore_ascii_case("female") => GenderRequirement::Female,
            _ => GenderRequirement::Any,
        }
    }

    /// Whether a posting with requirement `self` accepts a candidate filtered by `filter`
    pub fn accepts(self, filter: GenderRequirement) -> bool {
        filter == GenderRequirement::Any || self == GenderRequirement::Any || self == filter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmploymentType {
    #[serde(alias = "full_time")]
    FullTime,
    #[serde(alias = "part_time")]
    PartTime,
}

impl EmploymentType {
    /// Store flag `full_time`: `否` is part time, everything else (null included) full time
    pub fn from_full_time_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("否") => EmploymentType::PartTime,
            Some(other) if other.eq_ignore_ascii_case("no") || other.eq_ignore_ascii_case("false") => {
                EmploymentType::PartTime
            }
            _ => EmploymentType::FullTime,
        }
    }
}

/// A job posting at an employer site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: i64,
    pub job_type: String,
    pub employer_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    pub gender_requirement: GenderRequirement,
    pub employment_type: EmploymentType,
    pub currently_recruiting: bool,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub working_hours: Option<String>,
    #[serde(default)]
    pub age_requirement: Option<String>,
    #[serde(default)]
    pub job_content: Option<String>,
    #[serde(flatten)]
    pub details: HiringDetails,
}

/// Free-text hiring terms shown on job lookups, as written by the importers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiringDetails {
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub accept_criminal_record: Option<String>,
    #[serde(default)]
    pub relevant_experience: Option<String>,
    #[serde(default)]
    pub interview_time: Option<String>,
    #[serde(default)]
    pub trial_time: Option<String>,
    #[serde(default)]
    pub insurance_status: Option<String>,
    #[serde(default)]
    pub accommodation_status: Option<String>,
}

/// The matching request, immutable for the lifetime of one call
#[derive(Debug, Clone, Copy)]
pub struct CandidateQuery {
    pub origin: Coordinate,
    pub gender_filter: GenderRequirement,
    pub employment_type_filter: EmploymentType,
    pub max_commute_distance_km: f64,
}

/// Outcome of one routing call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub distance_meters: u64,
    pub duration_minutes: u32,
}

impl RouteResult {
    /// Build from provider seconds, rounding to the nearest whole minute
    pub fn from_seconds(distance_meters: u64, duration_seconds: u64) -> Self {
        let minutes = (duration_seconds as f64 / 60.0).round();
        Self {
            distance_meters,
            duration_minutes: minutes.min(u32::MAX as f64) as u32,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_meters as f64 / 1000.0
    }
}

/// A location returned by the nearest search, demand already filtered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationWithDistance {
    #[serde(flatten)]
    pub location: Location,
    pub distance_km: f64,
    pub map_url: Option<String>,
}

/// A location returned by name search, with a map link when it has a coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationWithLink {
    #[serde(flatten)]
    pub location: Location,
    pub map_url: Option<String>,
}

/// A posting that survived matching, with commute metrics attached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPosting {
    #[serde(flatten)]
    pub posting: JobPosting,
    pub straight_line_distance_km: f64,
    pub commute_distance_km: f64,
    pub commute_duration_minutes: u32,
    pub navigation_url: Option<String>,
}

/// A posting returned by a lookup, commute metrics present only when routed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingWithCommute {
    #[serde(flatten)]
    pub posting: JobPosting,
    pub straight_line_distance_km: Option<f64>,
    pub commute_distance_km: Option<f64>,
    pub commute_duration_minutes: Option<u32>,
}
