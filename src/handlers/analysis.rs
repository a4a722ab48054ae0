//! Analysis handlers
//!
//! HTTP surface for starting, polling, cancelling, and validate-only
//! checking of repository analyses. The start request blocks for the
//! duration of the crawl; polling and cancellation arrive on separate
//! connections and interleave at the crawler's await points.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::AppError;
use crate::handlers::{require_user, ApiResponse};
use crate::models::{AnalyzeRequest, ValidateRequest};
use crate::services::{AnalysisError, AnalysisService};
use crate::AppState;

/// Depth used when the client does not ask for one.
const DEFAULT_MAX_DEPTH: u32 = 5;
/// Hard bounds applied to client-supplied depth.
const MIN_DEPTH: u32 = 1;
const MAX_DEPTH: u32 = 20;

fn analysis_service(state: &AppState) -> AnalysisService {
    AnalysisService::new(
        state.github.clone(),
        state.progress.clone(),
        state.repos.clone(),
    )
}

/// POST /v1/analysis
///
/// Run one full analysis. Responds when the crawl finishes; a cancelled
/// crawl is a distinguishable outcome, not an error.
pub async fn start_analysis(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let request = body.into_inner();
    let max_depth = request
        .max_depth
        .unwrap_or(DEFAULT_MAX_DEPTH)
        .clamp(MIN_DEPTH, MAX_DEPTH);
    // Resolved here so the cancelled outcome can echo the id even when
    // the client left it to the server to generate.
    let analysis_id = request
        .analysis_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let service = analysis_service(&state);
    match service
        .analyze(&user_id, &request.url, max_depth, Some(analysis_id.clone()))
        .await
    {
        Ok(response) => Ok(HttpResponse::Created().json(ApiResponse::new(response))),
        Err(AnalysisError::Cancelled) => Ok(HttpResponse::Ok().json(ApiResponse::new(json!({
            "status": "cancelled",
            "analysisId": analysis_id,
        })))),
        Err(e) => Err(map_analysis_error(e)),
    }
}

/// GET /v1/analysis/{analysisId}/progress
///
/// Live progress for an in-flight crawl, visible only to the user who
/// started it. 404 once the crawl has terminated by any path; a foreign
/// crawl reports the same 404 without revealing its existence.
pub async fn poll_progress(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let analysis_id = path.into_inner();
    match state.progress.get(&analysis_id).await {
        Some(progress) if progress.user_id == user_id => {
            Ok(HttpResponse::Ok().json(ApiResponse::new(progress)))
        }
        _ => Err(AppError::NotFound(format!(
            "No analysis in progress: {analysis_id}"
        ))),
    }
}

/// POST /v1/analysis/{analysisId}/cancel
///
/// Set the one-way cancellation flag, owner-scoped like polling. The
/// crawl stops at its next check point; latency is bounded by one
/// in-flight upstream call.
pub async fn cancel_analysis(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let analysis_id = path.into_inner();
    let owned = state
        .progress
        .get(&analysis_id)
        .await
        .is_some_and(|p| p.user_id == user_id);
    if owned && state.progress.cancel(&analysis_id).await {
        Ok(HttpResponse::Accepted().json(ApiResponse::new(json!({
            "status": "cancelling",
            "analysisId": analysis_id,
        }))))
    } else {
        Err(AppError::NotFound(format!(
            "No analysis in progress: {analysis_id}"
        )))
    }
}

/// POST /v1/analysis/validate
///
/// Parse and validate a repository URL without crawling anything.
pub async fn validate_repo(
    state: web::Data<AppState>,
    body: web::Json<ValidateRequest>,
) -> Result<HttpResponse, AppError> {
    let service = analysis_service(&state);
    let validated = service
        .validate(&body.url)
        .await
        .map_err(map_analysis_error)?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(validated)))
}

/// Map analysis errors to application errors
fn map_analysis_error(e: AnalysisError) -> AppError {
    match e {
        AnalysisError::Parse(p) => AppError::Validation(p.to_string()),
        AnalysisError::NotFound => AppError::NotFound(e.to_string()),
        AnalysisError::AccessDenied(_) => AppError::AccessDenied(e.to_string()),
        AnalysisError::RateLimited(_) => AppError::RateLimited(e.to_string()),
        AnalysisError::EmptyRepository | AnalysisError::NoDefaultBranch => {
            AppError::Unprocessable(e.to_string())
        }
        AnalysisError::Upstream(_) => AppError::Upstream(e.to_string()),
        // Cancellation is handled before mapping; reaching here is a bug.
        AnalysisError::Cancelled => AppError::Internal("unexpected cancelled outcome".to_string()),
        AnalysisError::Storage(e) => e.into(),
    }
}

pub fn configure_analysis_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/analysis").route(web::post().to(start_analysis)));
    cfg.service(web::resource("/analysis/validate").route(web::post().to(validate_repo)));
    cfg.service(
        web::resource("/analysis/{analysisId}/progress").route(web::get().to(poll_progress)),
    );
    cfg.service(
        web::resource("/analysis/{analysisId}/cancel").route(web::post().to(cancel_analysis)),
    );
}
