pub mod ai;
pub mod analysis;
pub mod files;
pub mod records;
pub mod users;




pub use ai::configure_ai_routes;
pub use analysis::configure_analysis_routes;
pub use files::configure_file_routes;
pub use records::configure_record_routes;
pub use users::configure_user_routes;

use actix_web::HttpRequest;
use serde::Serialize;

use crate::error::AppError;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}

/// Caller identity from the `X-User-Id` header. Saved analyses and their
/// deletion are scoped to this id.
pub fn require_user(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Missing X-User-Id header".to_string()))
}
