use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core::filters::parse_demand_summary;
use crate::models::{
    Coordinate, EmploymentType, GenderRequirement, HiringDetails, JobPosting, Location,
};
use crate::services::store::{Repository, StoreError};

const LOCATION_COLUMNS: &str = r#"
    id, station_name, address, longitude, latitude,
    interview_contact_person, contact_phone, site_info_str, demand_info_str
"#;

const POSTING_COLUMNS: &str = r#"
    id, job_type, recruiting_unit, city, location, longitude, latitude,
    gender, full_time, currently_recruiting, salary, working_hours,
    age_requirement, job_content, special_requirements, accept_criminal_record,
    relevant_experience, interview_time, trial_time, insurance_status,
    accommodation_status
"#;

/// PostgreSQL reader for the `stations` and `job_positions` tables
///
/// The schema is owned by the importers; this client only selects.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

#[async_trait]
impl Repository for PostgresClient {
    async fn load_locations(&self) -> Result<Vec<Location>, StoreError> {
        let query = format!("SELECT {} FROM stations ORDER BY id", LOCATION_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let locations: Vec<Location> = rows.iter().filter_map(location_from_row).collect();
        tracing::debug!("Loaded {} locations", locations.len());

        Ok(locations)
    }

    async fn load_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        let query = format!("SELECT {} FROM job_positions ORDER BY id", POSTING_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let postings: Vec<JobPosting> = rows.iter().filter_map(posting_from_row).collect();
        tracing::debug!("Loaded {} job postings", postings.len());

        Ok(postings)
    }

    async fn find_posting(&self, id: i64) -> Result<Option<JobPosting>, StoreError> {
        let query = format!("SELECT {} FROM job_positions WHERE id = $1", POSTING_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(posting_from_row))
    }

    async fn count_locations(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stations")
            .fetch_one(&self.pool)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Null or out-of-range coordinates become `None`
fn coordinate_from_row(row: &PgRow) -> Option<Coordinate> {
    Coordinate::new(float(row, "longitude")?, float(row, "latitude")?).ok()
}

/// Importers have written both REAL and DOUBLE PRECISION columns
fn float(row: &PgRow, column: &str) -> Option<f64> {
    row.try_get::<Option<f64>, _>(column)
        .or_else(|_| row.try_get::<Option<f32>, _>(column).map(|v| v.map(f64::from)))
        .ok()
        .flatten()
}

/// Rows whose id cannot be decoded are skipped rather than read as id 0
fn row_id(row: &PgRow) -> Option<i64> {
    checked_id(
        row.try_get::<i64, _>("id")
            .or_else(|_| row.try_get::<i32, _>("id").map(i64::from)),
    )
}

fn checked_id(id: Result<i64, sqlx::Error>) -> Option<i64> {
    id.map_err(|e| tracing::warn!("Skipping row with undecodable id: {}", e))
        .ok()
}

fn text(row: &PgRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .filter(|value| !value.trim().is_empty())
}

fn location_from_row(row: &PgRow) -> Option<Location> {
    Some(Location {
        id: row_id(row)?,
        name: text(row, "station_name").unwrap_or_default(),
        address: text(row, "address"),
        coordinate: coordinate_from_row(row),
        contact_person: text(row, "interview_contact_person"),
        contact_phone: text(row, "contact_phone"),
        site_info: text(row, "site_info_str"),
        demand_summary: text(row, "demand_info_str")
            .map(|raw| parse_demand_summary(&raw))
            .unwrap_or_default(),
    })
}

fn posting_from_row(row: &PgRow) -> Option<JobPosting> {
    Some(JobPosting {
        id: row_id(row)?,
        job_type: text(row, "job_type").unwrap_or_default(),
        employer_name: text(row, "recruiting_unit").unwrap_or_default(),
        city: text(row, "city"),
        location_name: text(row, "location"),
        coordinate: coordinate_from_row(row),
        gender_requirement: GenderRequirement::from_label(text(row, "gender").as_deref()),
        employment_type: EmploymentType::from_full_time_flag(text(row, "full_time").as_deref()),
        currently_recruiting: matches!(
            text(row, "currently_recruiting").as_deref(),
            Some("是" | "true" | "yes" | "1")
        ),
        salary: text(row, "salary"),
        working_hours: text(row, "working_hours"),
        age_requirement: text(row, "age_requirement"),
        job_content: text(row, "job_content"),
        details: HiringDetails {
            special_requirements: text(row, "special_requirements"),
            accept_criminal_record: text(row, "accept_criminal_record"),
            relevant_experience: text(row, "relevant_experience"),
            interview_time: text(row, "interview_time"),
            trial_time: text(row, "trial_time"),
            insurance_status: text(row, "insurance_status"),
            accommodation_status: text(row, "accommodation_status"),
        },
    })
}
