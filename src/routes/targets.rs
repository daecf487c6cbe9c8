use actix_web::{web, HttpResponse, Responder};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use crate::models::{CompileResponse, ErrorResponse, HealthResponse, TargetQueryParams, TargetResponse, TargetStatus};
use crate::services::{ElasticsearchClient, TargetOutcome, TargetingError, TargetingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<ElasticsearchClient>,
    pub targeting: Arc<TargetingService<ElasticsearchClient>>,
}

/// Configure all targeting routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/targets/compile", web::post().to(compile_query))
        .route("/targets/query", web::post().to(query_targets));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let backend_healthy = state.backend.health_check().await.unwrap_or(false);

    let status = if backend_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

fn parse_failure(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Invalid targeting query".to_string(),
        message,
        status_code: 400,
    })
}

/// Compile a targeting document without running it
///
/// POST /api/v1/targets/compile
async fn compile_query(state: web::Data<AppState>, body: web::Json<Value>) -> impl Responder {
    match state.targeting.compile(body.into_inner()) {
        Ok(query) => HttpResponse::Ok().json(CompileResponse {
            query: query.into_value(),
        }),
        Err(e) => {
            tracing::info!("Rejected targeting document: {}", e);
            parse_failure(e.to_string())
        }
    }
}

/// Find every submitter matching a targeting document
///
/// POST /api/v1/targets/query?pageSize=1000
///
/// Request body:
/// ```json
/// {
///   "timeSlot": { "gte": "now-1000m", "lt": "now" },
///   "polygonPoints": [{ "lat": 30, "lon": 70 }, ...],
///   "answerQuery": { "and": [
///     { "symptomFever": { "questionId": "1", "answer": "yes" } },
///     { "symptomCough": { "questionId": "2", "answer": "yes" } }
///   ] }
/// }
/// ```
async fn query_targets(
    state: web::Data<AppState>,
    params: web::Query<TargetQueryParams>,
    body: web::Json<Value>,
) -> impl Responder {
    if let Err(errors) = params.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let page_size = params.page_size.unwrap_or_else(|| state.targeting.default_page_size());
    tracing::info!("Targeting request {} started (page size {})", request_id, page_size);

    match state.targeting.find_targets(body.into_inner(), params.page_size).await {
        Ok(outcome) => {
            let (status, mut submitters) = match outcome {
                TargetOutcome::Found(ids) => (TargetStatus::Found, ids.into_iter().collect::<Vec<_>>()),
                TargetOutcome::NoTargets => (TargetStatus::NoTargets, Vec::new()),
            };
            submitters.sort_unstable();

            tracing::info!("Targeting request {} returned {} submitters", request_id, submitters.len());

            HttpResponse::Ok().json(TargetResponse {
                request_id,
                status,
                count: submitters.len(),
                submitters,
            })
        }
        Err(TargetingError::Parse(e)) => {
            tracing::info!("Targeting request {} rejected: {}", request_id, e);
            parse_failure(e.to_string())
        }
        Err(TargetingError::Retrieval(e)) => {
            tracing::error!("Targeting request {} failed: {}", request_id, e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Search backend failure".to_string(),
                message: e.to_string(),
                status_code: 502,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_response() {
        let response = parse_failure("No operation found at answerQuery".to_string());
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
