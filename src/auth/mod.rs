use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub(crate) mod extractors;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::session_routes())
}
