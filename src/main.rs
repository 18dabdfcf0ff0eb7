use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use commute_match::config::{Settings, StoreBackend};
use commute_match::core::{JobMatcher, NearestLocationFinder};
use commute_match::routes::{self, AppState};
use commute_match::services::{
    AmapClient, Geocoder, PostgresClient, Repository, RouteProvider, SnapshotStore,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn open_repository(settings: &Settings) -> io::Result<Arc<dyn Repository>> {
    match settings.store.backend {
        StoreBackend::Snapshot => {
            let path = settings.store.snapshot_path.as_deref().unwrap_or_default();
            let store = SnapshotStore::load(path)
                .await
                .map_err(|e| startup_error("Failed to load snapshot", e))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let db = &settings.database;
            let postgres = PostgresClient::from_settings(
                &db.url,
                db.max_connections,
                db.min_connections,
                db.acquire_timeout_secs,
                db.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

            info!(
                "PostgreSQL client initialized (max: {} connections)",
                db.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(postgres))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings);

    info!("Starting commute-match service...");

    if settings.amap.api_key.is_empty() {
        warn!("AMAP_API_KEY is not set; geocoding and routing calls will be rejected upstream");
    }

    let amap = Arc::new(
        AmapClient::new(
            settings.amap.endpoint.clone(),
            settings.amap.api_key.clone(),
            Duration::from_secs(settings.amap.timeout_secs),
        )
        .map_err(|e| startup_error("Failed to build HTTP client", e))?
        .with_retry_policies(settings.geocoding.policy(), settings.routing.policy()),
    );

    info!(
        "AMap client initialized ({} geocoding / {} routing attempts)",
        settings.geocoding.max_retries, settings.routing.max_retries
    );

    let repository = open_repository(&settings).await?;

    let geocoder: Arc<dyn Geocoder> = amap.clone();
    let route_provider: Arc<dyn RouteProvider> = amap;
    let matcher = JobMatcher::new(
        route_provider,
        settings.matching.max_workers,
        settings.matching.straight_line_factor,
    );

    info!(
        "Matcher initialized (workers: {}, straight-line factor: {})",
        settings.matching.max_workers, settings.matching.straight_line_factor
    );

    // Build application state
    let app_state = AppState {
        repository,
        geocoder,
        matcher,
        finder: NearestLocationFinder::new(),
        request_timeout: settings.matching.request_timeout(),
        default_k: settings.matching.default_k,
        max_k: settings.matching.max_k,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
