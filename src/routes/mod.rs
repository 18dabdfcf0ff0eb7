// Route exports
pub mod tools;

pub use tools::AppState;

use actix_web::{error, web, HttpRequest};

use crate::error::MatchError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(tools::configure),
    );
}

/// Malformed JSON bodies become `400 invalid_input` in the standard error shape
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(handle_json_payload_error)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handle_query_payload_error)
}

fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    MatchError::InvalidInput(format!("Invalid JSON: {}", err)).into()
}

fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    MatchError::InvalidInput(format!("Invalid query: {}", err)).into()
}
