use serde::{Deserialize, Serialize};

use crate::auth::services::PasswordStrength;
use crate::session::{AuthMode, SessionState, View};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordStrengthRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthModeRequest {
    pub mode: AuthMode,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub next_view: View,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordStrengthResponse {
    pub strength: PasswordStrength,
}

/// Everything a client needs to pick its next view.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    pub username: Option<String>,
    pub auth_mode: AuthMode,
    pub view: View,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_count: i64,
}
