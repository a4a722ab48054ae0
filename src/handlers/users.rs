//! User account handlers

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use tracing::info;

use crate::error::AppError;
use crate::handlers::{require_user, ApiResponse};
use crate::models::{RegisterUserRequest, User};
use crate::AppState;

/// POST /v1/users
///
/// Register a user and hand back the id the client uses in `X-User-Id`.
pub async fn register_user(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    if request.display_name.trim().is_empty() {
        return Err(AppError::Validation("displayName must not be empty".to_string()));
    }

    let user = User {
        user_id: uuid::Uuid::new_v4().to_string(),
        display_name: request.display_name.trim().to_string(),
        email: request.email,
        created_at: Utc::now(),
    };
    state.users.insert_user(&user).await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(user)))
}

/// GET /v1/users/me
pub async fn get_me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    match state.users.get_user(&user_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(ApiResponse::new(user))),
        None => Err(AppError::NotFound(format!("User not found: {user_id}"))),
    }
}

/// DELETE /v1/users/me
///
/// Delete the account and its saved analyses. Best-effort sequential:
/// records first, then the user row; there is no cross-collection
/// transaction.
pub async fn delete_me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&req)?;
    let removed = state.repos.delete_records_for_user(&user_id).await?;
    state.users.delete_user(&user_id).await?;
    info!(%user_id, removed, "account deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/users").route(web::post().to(register_user)));
    cfg.service(
        web::resource("/users/me")
            .route(web::get().to(get_me))
            .route(web::delete().to(delete_me)),
    );
}
