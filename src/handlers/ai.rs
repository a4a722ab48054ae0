//! AI handlers
//!
//! LLM-backed code analysis and chat for saved analyses.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::handlers::{require_user, ApiResponse};
use crate::services::{LlmClient, LlmError};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalyzeRequest {
    pub record_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Optional saved analysis to fold into the prompt as context.
    #[serde(default)]
    pub record_id: Option<String>,
}

fn llm_client(state: &AppState) -> Result<&LlmClient, AppError> {
    state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::Unprocessable(LlmError::NotConfigured.to_string()))
}

/// POST /v1/ai/analyze
///
/// Structured code analysis of a saved record. Malformed provider output
/// is repaired or replaced server-side; this endpoint never surfaces a
/// parse failure.
pub async fn analyze_record(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<AiAnalyzeRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let llm = llm_client(&state)?;

    let record = state
        .repos
        .get_record(&user_id, &body.record_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis not found: {}", body.record_id)))?;

    let analysis = llm.analyze_record(&record).await.map_err(map_llm_error)?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(analysis)))
}

/// POST /v1/ai/chat
pub async fn chat(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let llm = llm_client(&state)?;
    let request = body.into_inner();

    let context = match &request.record_id {
        Some(record_id) => {
            let record = state
                .repos
                .get_record(&user_id, record_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Analysis not found: {record_id}")))?;
            Some(format!(
                "{}/{}: {} files, {} folders, primary language {}",
                record.owner,
                record.repo,
                record.stats.analyzed_files,
                record.stats.analyzed_folders,
                record.stats.language.as_deref().unwrap_or("unknown"),
            ))
        }
        None => None,
    };

    let reply = llm
        .chat(&request.message, context.as_deref())
        .await
        .map_err(map_llm_error)?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(json!({ "reply": reply }))))
}

fn map_llm_error(e: LlmError) -> AppError {
    match e {
        LlmError::NotConfigured => AppError::Unprocessable(e.to_string()),
        LlmError::Upstream(_) | LlmError::Decode(_) | LlmError::Client(_) => {
            AppError::Upstream(e.to_string())
        }
    }
}

pub fn configure_ai_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ai/analyze").route(web::post().to(analyze_record)));
    cfg.service(web::resource("/ai/chat").route(web::post().to(chat)));
}
