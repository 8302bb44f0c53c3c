//! Runtime configuration: command-line flags with environment fallbacks.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::time::Duration;

use crate::connect::RetryPolicy;
use crate::fetch::{DEFAULT_FEED_URL, DEFAULT_ROWS, with_rows};

/// Where the store lives.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Full connection url (`postgres://...` or `sqlite:...`); overrides the parts below
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "POSTGRES_HOST", default_value = "db_app")]
    pub db_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "POSTGRES_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "POSTGRES_DB")]
    pub db_name: Option<String>,

    /// Connection attempts before giving up
    #[arg(long, env = "CONNECT_ATTEMPTS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub connect_attempts: u32,

    /// Seconds to wait between connection attempts
    #[arg(long, env = "CONNECT_DELAY_SECS", default_value_t = 30)]
    pub connect_delay_secs: u64,
}

impl DatabaseConfig {
    /// The url to connect to, assembled from parts when no full url is given.
    pub fn url(&self) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let Some(db_name) = &self.db_name else {
            bail!("no database configured: set DATABASE_URL or POSTGRES_DB");
        };

        let mut url = reqwest::Url::parse(&format!(
            "postgres://{}:{}/{}",
            self.db_host, self.db_port, db_name
        ))
        .context("invalid database host or name")?;

        if let Some(user) = &self.db_user {
            url.set_username(user)
                .map_err(|_| anyhow::anyhow!("cannot set database user"))?;
        }
        if let Some(password) = &self.db_password {
            url.set_password(Some(password))
                .map_err(|_| anyhow::anyhow!("cannot set database password"))?;
        }

        Ok(url.to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_attempts,
            delay: Duration::from_secs(self.connect_delay_secs),
        }
    }
}

/// Which feed to poll and how.
#[derive(Debug, Clone, Args)]
pub struct FeedConfig {
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Records requested per fetch
    #[arg(long, env = "FEED_ROWS", default_value_t = DEFAULT_ROWS)]
    pub feed_rows: u32,

    /// Ceiling on a single HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 60)]
    pub http_timeout_secs: u64,
}

impl FeedConfig {
    pub fn url(&self) -> Result<String> {
        Ok(with_rows(&self.feed_url, self.feed_rows)?.to_string())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// How often to poll and for how long.
#[derive(Debug, Clone, Args)]
pub struct ScheduleConfig {
    /// Seconds between ticks
    #[arg(long, env = "POLL_PERIOD_SECS", default_value_t = 20,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub period_secs: u64,

    /// Total run length in seconds (default: 30 days)
    #[arg(long, env = "RUN_DURATION_SECS", default_value_t = 30 * 24 * 3600)]
    pub duration_secs: u64,
}

impl ScheduleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}
