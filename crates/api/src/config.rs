use std::path::PathBuf;
use std::str::FromStr;

use stockroom_core::pagination::DEFAULT_PAGE_SIZE;

/// A configuration variable that is set but cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{name} must be a valid {expected}, got {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Root directory for uploaded images (default: `storage/uploads`).
    pub upload_dir: PathBuf,
    /// Page size for list endpoints when the caller sends none.
    pub default_page_size: i64,
    /// Request body limit for multipart uploads (default: 25 MiB).
    pub max_upload_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parsed<T: FromStr>(
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = var_or(name, default);
    value.trim().parse().map_err(|_| ConfigError {
        name,
        expected,
        value,
    })
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `UPLOAD_DIR`           | `storage/uploads`          |
    /// | `DEFAULT_PAGE_SIZE`    | `10`                       |
    /// | `MAX_UPLOAD_BYTES`     | `26214400`                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = var_or("HOST", "0.0.0.0");
        let port = parsed("PORT", "3000", "u16")?;

        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parsed("REQUEST_TIMEOUT_SECS", "30", "u64")?;
        let shutdown_timeout_secs = parsed("SHUTDOWN_TIMEOUT_SECS", "30", "u64")?;
        let upload_dir = PathBuf::from(var_or("UPLOAD_DIR", "storage/uploads"));

        let default_page_size: i64 = parsed(
            "DEFAULT_PAGE_SIZE",
            &DEFAULT_PAGE_SIZE.to_string(),
            "positive integer",
        )?;
        if default_page_size < 1 {
            return Err(ConfigError {
                name: "DEFAULT_PAGE_SIZE",
                expected: "positive integer",
                value: default_page_size.to_string(),
            });
        }

        let max_upload_bytes = parsed("MAX_UPLOAD_BYTES", "26214400", "byte count")?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            upload_dir,
            default_page_size,
            max_upload_bytes,
        })
    }
}
