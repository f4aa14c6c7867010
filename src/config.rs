use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service against the in-memory user store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Upper bound on sessions held in memory before idle ones are evicted.
    pub max_sessions: usize,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);
        let max_sessions = std::env::var("MAX_SESSIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10_000);
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        };
        Ok(Self {
            database_url,
            db_max_connections,
            max_sessions,
            server,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            database_url: None,
            db_max_connections: 1,
            max_sessions: 64,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
        }
    }
}
