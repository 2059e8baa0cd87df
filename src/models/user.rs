use serde::{Deserialize, Serialize};

use super::role::Role;

/// User profile as returned by the backend and kept in the session.
///
/// `user_id` is the employee identifier (e.g. `PI0824.2374`), not a row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub operator: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            username: String::new(),
            role,
            operator: String::new(),
            is_active: true,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub user_id: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
}

/// Admin-side user update; absent fields are left untouched by the backend.
#[derive(Debug, Default, Serialize)]
pub struct UserUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
