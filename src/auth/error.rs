use axum::http::StatusCode;
use tracing::error;

use crate::auth::repo_types::RepoError;

/// Every way a register/login/session request can fail. The display text is
/// what the client is shown.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please fill all fields")]
    MissingFields,
    #[error("Username must be at least 3 characters long")]
    UsernameTooShort,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Please enter username and password")]
    MissingCredentials,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Already logged in")]
    AlreadyAuthenticated,
    #[error("Database error")]
    Store(#[source] RepoError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields
            | Self::UsernameTooShort
            | Self::PasswordTooShort
            | Self::PasswordMismatch
            | Self::InvalidEmail
            | Self::MissingCredentials => StatusCode::BAD_REQUEST,
            Self::UsernameTaken | Self::EmailTaken | Self::AlreadyAuthenticated => {
                StatusCode::CONFLICT
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for (StatusCode, String) {
    fn from(err: AuthError) -> Self {
        if let AuthError::Store(source) = &err {
            error!(error = %source, "store operation failed");
        }
        (err.status(), err.to_string())
    }
}
