//! Sync API server configuration.
//!
//! Loaded from environment variables (after `.env`) with fallback to
//! defaults. ERP and sync settings live in `BridgeConfig`; this covers only
//! what the HTTP process itself needs.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,

    /// Optional TOML file with `[erp]`, `[webhook]` and `[sync]` sections
    pub bridge_config_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var              | Default     |
    /// |----------------------|-------------|
    /// | `HOST`               | `0.0.0.0`   |
    /// | `PORT`               | `3000`      |
    /// | `DATABASE_URL`       | required    |
    /// | `DB_MAX_CONNECTIONS` | `10`        |
    /// | `RUN_MIGRATIONS`     | `false`     |
    /// | `STOCKBRIDGE_CONFIG` | unset       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            None => 3000,
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|n: &u32| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            None => 10,
        };

        let run_migrations = match get("RUN_MIGRATIONS").as_deref() {
            None => false,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(_) => return Err(ConfigError::InvalidValue("RUN_MIGRATIONS".to_string())),
        };

        Ok(ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL")
                .ok_or_else(|| ConfigError::MissingRequired("DATABASE_URL".to_string()))?,
            db_max_connections,
            run_migrations,
            bridge_config_path: get("STOCKBRIDGE_CONFIG").map(PathBuf::from),
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HOST".to_string()))
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"[REDACTED]")
            .field("db_max_connections", &self.db_max_connections)
            .field("run_migrations", &self.run_migrations)
            .field("bridge_config_path", &self.bridge_config_path)
            .finish()
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
