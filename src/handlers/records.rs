//! Saved-analysis handlers
//!
//! Listing, fetching, and deleting a user's saved analyses, plus the
//! global stats endpoint.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::AppError;
use crate::handlers::{require_user, ApiResponse};
use crate::models::RecordSummary;
use crate::services::ANALYSES_COUNTER;
use crate::AppState;

/// GET /v1/records
///
/// All of the caller's saved analyses, newest first, without trees.
pub async fn list_records(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let records = state.repos.list_records(&user_id).await?;
    let summaries: Vec<RecordSummary> = records.iter().map(RecordSummary::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::new(summaries)))
}

/// GET /v1/records/{recordId}
///
/// One saved analysis including its full tree.
pub async fn get_record(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let record_id = path.into_inner();
    match state.repos.get_record(&user_id, &record_id).await? {
        Some(record) => Ok(HttpResponse::Ok().json(ApiResponse::new(record))),
        None => Err(AppError::NotFound(format!(
            "Analysis not found: {record_id}"
        ))),
    }
}

/// DELETE /v1/records/{recordId}
///
/// Owner-scoped delete. A record owned by someone else reports NotFound
/// rather than revealing its existence.
pub async fn delete_record(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let record_id = path.into_inner();
    state.repos.delete_record(&user_id, &record_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /v1/stats
///
/// Global analysis counter.
pub async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let analyses_completed = state.repos.get_counter(ANALYSES_COUNTER).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(json!({
        "analysesCompleted": analyses_completed,
    }))))
}

pub fn configure_record_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/records").route(web::get().to(list_records)));
    cfg.service(
        web::resource("/records/{recordId}")
            .route(web::get().to(get_record))
            .route(web::delete().to(delete_record)),
    );
    cfg.service(web::resource("/stats").route(web::get().to(get_stats)));
}
