//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// PostgreSQL URL. Records stay in memory when absent.
    pub database_url: Option<String>,
    /// Directory holding content documents.
    pub content_dir: PathBuf,
    /// Pool size for the PostgreSQL store.
    pub database_max_connections: u32,
}

fn parsed<T: std::str::FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} must be valid: {e}"))),
    }
}

impl AppConfig {
    /// Reads configuration through `lookup`, which returns the value of an
    /// environment variable when it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a numeric variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let database_max_connections = parsed(
            "DATABASE_MAX_CONNECTIONS",
            set("DATABASE_MAX_CONNECTIONS"),
            10_u32,
        )?;
        if database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        Ok(Self {
            host: set("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parsed("PORT", set("PORT"), 3000_u16)?,
            database_url: set("DATABASE_URL"),
            content_dir: set("CONTENT_DIR").map_or_else(|| PathBuf::from("content"), PathBuf::from),
            database_max_connections,
        })
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST` is not an IP address.
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
