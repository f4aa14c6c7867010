use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                      // assigned by the store
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,             // stored verbatim, never exposed in JSON
    pub created_at: OffsetDateTime,   // set by the store on insert
}

/// Values for a row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Unique column a rejected insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueColumn {
    Username,
    Email,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("duplicate value for unique column {0:?}")]
    Duplicate(UniqueColumn),
    #[error("unique constraint violated: {0}")]
    UnknownConstraint(String),
    #[error("store unavailable: {0}")]
    Unavailable(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
