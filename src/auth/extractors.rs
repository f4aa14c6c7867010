use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::warn;

use crate::session::ClientId;

pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Reads the client id the UI instance sent, which keys its session.
pub struct Client(pub ClientId);

#[async_trait]
impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::BAD_REQUEST,
                "Missing X-Client-Id header".to_string(),
            ))?;

        let id = ClientId::parse(raw).ok_or_else(|| {
            warn!("rejected malformed client id");
            (
                StatusCode::BAD_REQUEST,
                "Invalid X-Client-Id header".to_string(),
            )
        })?;

        Ok(Client(id))
    }
}
