//! User entity and account payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user. Saved analyses are scoped to a user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for user registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
}
