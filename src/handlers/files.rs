//! File-content handler
//!
//! Fetches one file's raw text through the upstream contents API.

use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::github::GitHubError;
use crate::handlers::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: String,
}

/// GET /v1/repos/{owner}/{repo}/file?path=...
///
/// The upstream contents API returns base64 for files under its size cap;
/// larger or binary content is reported as unavailable rather than
/// garbled.
pub async fn get_file_content(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<FileQuery>,
) -> Result<HttpResponse, AppError> {
    let (owner, repo) = path.into_inner();
    let file = state
        .github
        .file_content(&owner, &repo, &query.path)
        .await
        .map_err(map_github_error)?;

    let encoded = match (file.encoding.as_deref(), &file.content) {
        (Some("base64"), Some(content)) => content,
        _ => {
            return Err(AppError::Unprocessable(format!(
                "Content for {} is not available inline; use its download URL",
                file.path
            )))
        }
    };

    let raw: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(raw)
        .map_err(|_| AppError::Upstream("Upstream sent undecodable file content".to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| {
        AppError::Unprocessable(format!("{} looks like a binary file", file.path))
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(json!({
        "name": file.name,
        "path": file.path,
        "size": file.size,
        "content": text,
        "downloadUrl": file.download_url,
    }))))
}

fn map_github_error(e: GitHubError) -> AppError {
    match e {
        GitHubError::NotFound => AppError::NotFound("File not found in repository".to_string()),
        GitHubError::AccessDenied(msg) => AppError::AccessDenied(msg),
        GitHubError::RateLimited(msg) => AppError::RateLimited(msg),
        // A directory path makes the contents API return a listing, which
        // does not decode as a single file. Client mistake, not an outage.
        GitHubError::Decode(_) => AppError::Unprocessable(
            "That path does not point to a readable file".to_string(),
        ),
        GitHubError::Upstream(msg) | GitHubError::Client(msg) => AppError::Upstream(msg),
    }
}

pub fn configure_file_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/repos/{owner}/{repo}/file").route(web::get().to(get_file_content)),
    );
}
