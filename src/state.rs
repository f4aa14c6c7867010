use std::sync::Arc;

use crate::auth::repo::{MemoryUserRepository, PgUserRepository, UserRepository};
use crate::config::AppConfig;
use crate::db;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let users = match config.database_url.as_deref() {
            Some(url) => {
                let pool = db::connect(url, config.db_max_connections).await?;
                Arc::new(PgUserRepository::new(pool)) as Arc<dyn UserRepository>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory only");
                Arc::new(MemoryUserRepository::new()) as Arc<dyn UserRepository>
            }
        };

        Ok(Self::from_parts(users, Arc::new(config)))
    }

    pub fn from_parts(users: Arc<dyn UserRepository>, config: Arc<AppConfig>) -> Self {
        Self {
            users,
            sessions: SessionStore::with_capacity(config.max_sessions),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(AppConfig::in_memory()),
        )
    }
}
