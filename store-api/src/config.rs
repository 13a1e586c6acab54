use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

const DATABASE_ENV: &str = "STORE_API_DATABASE";
const JWT_SECRET_ENV: &str = "STORE_API_JWT_SECRET";

#[derive(Debug, Default, Parser)]
#[command(
    name = "store-api",
    version,
    about = "REST API for stores and items with JWT authentication"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// SQLite database file, or `:memory:`.
    #[arg(long, short = 'd', value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Access token lifetime, e.g. `5m` or `1h`.
    #[arg(long, value_name = "DURATION")]
    pub token_ttl: Option<String>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Sustained requests per second across all clients.
    pub requests_per_second: u64,
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            burst: 50,
        }
    }
}

impl RateLimit {
    /// Time for one request slot to refill, never shorter than a millisecond.
    pub fn replenish_interval(&self) -> Duration {
        let millis = 1000 / self.requests_per_second.max(1);
        Duration::from_millis(millis.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub rate_limit: RateLimit,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid token lifetime {value:?}: {source}")]
    InvalidTokenTtl {
        value: String,
        source: humantime::DurationError,
    },
    #[error("no JWT secret configured; set STORE_API_JWT_SECRET or `jwt_secret` in the config file")]
    MissingJwtSecret,
    #[error("env var {key} is not valid unicode")]
    NonUnicodeEnv { key: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    bind: Option<SocketAddr>,
    database: Option<PathBuf>,
    jwt_secret: Option<String>,
    token_ttl: Option<String>,
    rate_limit_per_second: Option<u64>,
    rate_limit_burst: Option<u32>,
}

/// Values read from the process environment.
#[derive(Debug, Default)]
pub struct EnvConfig {
    database: Option<PathBuf>,
    jwt_secret: Option<String>,
}

impl EnvConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: read_env(DATABASE_ENV)?.map(PathBuf::from),
            jwt_secret: read_env(JWT_SECRET_ENV)?,
        })
    }
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;
        let from_env = EnvConfig::from_env()?;
        Self::resolve(cli, from_file, from_env)
    }

    /// Merge sources. CLI wins over the environment, the environment over the file.
    pub fn resolve(cli: Cli, file: FileConfig, env: EnvConfig) -> Result<Self, ConfigError> {
        let bind = cli
            .bind
            .or(file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5000)));
        let database = cli
            .database
            .or(env.database)
            .or(file.database)
            .unwrap_or_else(|| PathBuf::from("data.db"));
        let jwt_secret = env
            .jwt_secret
            .or(file.jwt_secret)
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;
        let ttl_raw = cli
            .token_ttl
            .or(file.token_ttl)
            .unwrap_or_else(|| String::from("5m"));
        let token_ttl = parse_ttl(&ttl_raw)?;

        let defaults = RateLimit::default();
        let rate_limit = RateLimit {
            requests_per_second: file
                .rate_limit_per_second
                .unwrap_or(defaults.requests_per_second)
                .max(1),
            burst: file.rate_limit_burst.unwrap_or(defaults.burst).max(1),
        };

        Ok(Self {
            bind,
            database,
            jwt_secret,
            token_ttl,
            rate_limit,
        })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|source| ConfigError::InvalidTokenTtl {
        value: String::from(raw),
        source,
    })
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicodeEnv {
            key: String::from(key),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{
        parse_ttl, read_file_config, AppConfig, Cli, ConfigError, EnvConfig, FileConfig, RateLimit,
    };

    fn env_with_secret() -> EnvConfig {
        EnvConfig {
            database: None,
            jwt_secret: Some(String::from("env-secret")),
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() -> Result<()> {
        let config = AppConfig::resolve(Cli::default(), FileConfig::default(), env_with_secret())?;

        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.database, PathBuf::from("data.db"));
        assert_eq!(config.jwt_secret, "env-secret");
        assert_eq!(config.token_ttl, Duration::from_secs(300));
        assert_eq!(config.rate_limit.requests_per_second, 20);
        assert_eq!(config.rate_limit.burst, 50);
        Ok(())
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = AppConfig::resolve(Cli::default(), FileConfig::default(), EnvConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingJwtSecret)));
    }

    #[test]
    fn blank_secret_is_an_error() {
        let env = EnvConfig {
            database: None,
            jwt_secret: Some(String::from("   ")),
        };
        let result = AppConfig::resolve(Cli::default(), FileConfig::default(), env);
        assert!(matches!(result, Err(ConfigError::MissingJwtSecret)));
    }

    #[test]
    fn cli_overrides_env_and_env_overrides_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("store-api.toml");
        std::fs::write(
            &path,
            "bind = \"127.0.0.1:8000\"\ndatabase = \"file.db\"\njwt_secret = \"file-secret\"\ntoken_ttl = \"1h\"\nrate_limit_burst = 0\n",
        )?;
        let file = read_file_config(Some(&path))?;
        let env = EnvConfig {
            database: Some(PathBuf::from("env.db")),
            jwt_secret: Some(String::from("env-secret")),
        };
        let cli = Cli {
            database: Some(PathBuf::from("cli.db")),
            ..Cli::default()
        };

        let config = AppConfig::resolve(cli, file, env)?;

        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.database, PathBuf::from("cli.db"));
        assert_eq!(config.jwt_secret, "env-secret");
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.rate_limit.burst, 1);
        Ok(())
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "bind = 12").unwrap();

        assert!(matches!(
            read_file_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn parse_ttl_accepts_humantime_values() {
        assert_eq!(parse_ttl("5m").ok(), Some(Duration::from_secs(300)));
        assert_eq!(parse_ttl(" 90s ").ok(), Some(Duration::from_secs(90)));
        assert!(parse_ttl("soon").is_err());
    }

    #[test]
    fn replenish_interval_spreads_requests_over_a_second() {
        let limit = |requests_per_second| RateLimit {
            requests_per_second,
            burst: 1,
        };
        assert_eq!(limit(20).replenish_interval(), Duration::from_millis(50));
        assert_eq!(limit(1).replenish_interval(), Duration::from_secs(1));
        assert_eq!(limit(5000).replenish_interval(), Duration::from_millis(1));
        assert_eq!(limit(0).replenish_interval(), Duration::from_secs(1));
    }
}
