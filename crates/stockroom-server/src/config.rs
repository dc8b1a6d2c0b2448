use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Session secrets that MUST NOT survive into a release deployment.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("STOCKROOM_SESSION_SECRET is unset or still a placeholder")]
    PlaceholderSecret,
}

/// Everything read from the environment, once, at startup. Missing
/// optional values fall back to development defaults with a warning
/// instead of a hard crash.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub sweep_interval_secs: u64,
    pub sweep_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("STOCKROOM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("STOCKROOM_PORT", "8350")?;

        let db_path: PathBuf = std::env::var("STOCKROOM_DB_PATH")
            .unwrap_or_else(|_| "stockroom.db".into())
            .into();
        let storage_dir: PathBuf = std::env::var("STOCKROOM_STORAGE_DIR")
            .unwrap_or_else(|_| "./object-storage".into())
            .into();

        let public_base_url = match std::env::var("STOCKROOM_PUBLIC_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(url.trim().trim_end_matches('/').to_string()),
            _ => {
                warn!(
                    "STOCKROOM_PUBLIC_BASE_URL is unset; uploads will fail at URL resolution \
                     until it is configured"
                );
                None
            }
        };

        let session_secret = std::env::var("STOCKROOM_SESSION_SECRET").unwrap_or_default();
        let session_secret = if session_secret.is_empty()
            || PLACEHOLDER_SECRETS.contains(&session_secret.as_str())
        {
            if cfg!(debug_assertions) {
                warn!("STOCKROOM_SESSION_SECRET is unset or a placeholder; using the dev secret");
                "dev-secret-change-me".to_string()
            } else {
                return Err(ConfigError::PlaceholderSecret);
            }
        } else {
            session_secret
        };

        let session_ttl_hours: i64 = parse_var("STOCKROOM_SESSION_TTL_HOURS", "168")?;
        let sweep_interval_secs: u64 = parse_var("STOCKROOM_SWEEP_INTERVAL_SECS", "3600")?;
        let sweep_grace_hours: u64 = parse_var("STOCKROOM_SWEEP_GRACE_HOURS", "24")?;

        Ok(Self {
            host,
            port,
            db_path,
            storage_dir,
            public_base_url,
            session_secret,
            session_ttl_hours,
            sweep_interval_secs,
            sweep_grace: Duration::from_secs(sweep_grace_hours * 3600),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.into());
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue(name, raw))
}
