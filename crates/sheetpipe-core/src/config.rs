//! Configuration module
//!
//! Worker configuration loaded from the environment. Connection URLs are
//! required; everything else has defaults tuned for small deployments.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECS: u64 = 30;
const IMPORT_BATCH_SIZE: i64 = 10;
const PROCESS_BATCH_SIZE: i64 = 100;
const DUPLICATE_TTL_SECS: u64 = 86_400;
const POLL_INTERVAL_SECS: u64 = 10;
const RETRY_BACKOFF_SECS: u64 = 5;
const STALE_CLAIM_GRACE_SECS: u64 = 900;
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Uploads claimed per import pass.
    pub import_batch_size: i64,
    /// Rows claimed per process pass.
    pub process_batch_size: i64,
    /// TTL of duplicate-cache entries.
    pub duplicate_ttl: Duration,
    /// Idle wait between passes when no work was found.
    pub poll_interval: Duration,
    /// Wait after a pass aborts on an infrastructure failure.
    pub retry_backoff: Duration,
    /// Claims older than this are returned to pending before each pass.
    pub stale_claim_grace: Duration,
    pub download_timeout: Duration,
    /// Scratch directory for downloaded source files.
    pub temp_dir: PathBuf,
    pub environment: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = WorkerConfig {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECS),
            import_batch_size: env::var("IMPORT_BATCH_SIZE")
                .unwrap_or_else(|_| IMPORT_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(IMPORT_BATCH_SIZE),
            process_batch_size: env::var("PROCESS_BATCH_SIZE")
                .unwrap_or_else(|_| PROCESS_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(PROCESS_BATCH_SIZE),
            duplicate_ttl: Duration::from_secs(
                env::var("DUPLICATE_TTL_SECS")
                    .unwrap_or_else(|_| DUPLICATE_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(DUPLICATE_TTL_SECS),
            ),
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| POLL_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(POLL_INTERVAL_SECS),
            ),
            retry_backoff: Duration::from_secs(
                env::var("RETRY_BACKOFF_SECS")
                    .unwrap_or_else(|_| RETRY_BACKOFF_SECS.to_string())
                    .parse()
                    .unwrap_or(RETRY_BACKOFF_SECS),
            ),
            stale_claim_grace: Duration::from_secs(
                env::var("STALE_CLAIM_GRACE_SECS")
                    .unwrap_or_else(|_| STALE_CLAIM_GRACE_SECS.to_string())
                    .parse()
                    .unwrap_or(STALE_CLAIM_GRACE_SECS),
            ),
            download_timeout: Duration::from_secs(
                env::var("DOWNLOAD_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DOWNLOAD_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(DOWNLOAD_TIMEOUT_SECS),
            ),
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("sheetpipe")),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a PostgreSQL connection string"
            ));
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(anyhow::anyhow!("REDIS_URL must be a Redis connection URL"));
        }

        if self.import_batch_size < 1 || self.process_batch_size < 1 {
            return Err(anyhow::anyhow!("Batch sizes must be at least 1"));
        }

        if self.duplicate_ttl.is_zero() {
            return Err(anyhow::anyhow!("DUPLICATE_TTL_SECS must be at least 1"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
