use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub use sqlx::SqlitePool;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub path: PathBuf,

    pub max_connections: u32,       // 4
    pub busy_timeout_secs: u64,     // 5
    pub acquire_timeout_secs: u64,  // 5

    /// true: will fail when the database cannot be opened.
    /// false: will log and continue; the first use of get_pool() will retry.
    pub eager_init: bool, // false

    /// true: run migrations after the first successful open.
    pub migrate_on_start: bool, // true
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reel.db"),
            max_connections: 4,
            busy_timeout_secs: 5,
            acquire_timeout_secs: 5,
            eager_init: false,
            migrate_on_start: true,
        }
    }
}

impl DbConfig {
    /// - REEL_DB_PATH (default "reel.db")
    /// - REEL_DB_MAX_CONNECTIONS (default 4)
    /// - REEL_DB_BUSY_TIMEOUT_SECS (default 5)
    /// - REEL_DB_ACQUIRE_TIMEOUT_SECS (default 5)
    /// - REEL_DB_EAGER_INIT (bool, default false)
    /// - REEL_DB_MIGRATE_ON_START (bool, default true)
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = std::env::var("REEL_DB_PATH") {
            if !path.trim().is_empty() {
                cfg.path = PathBuf::from(path);
            }
        }

        cfg.max_connections = parse_env_u32("REEL_DB_MAX_CONNECTIONS", cfg.max_connections);
        cfg.busy_timeout_secs = parse_env_u64("REEL_DB_BUSY_TIMEOUT_SECS", cfg.busy_timeout_secs);
        cfg.acquire_timeout_secs =
            parse_env_u64("REEL_DB_ACQUIRE_TIMEOUT_SECS", cfg.acquire_timeout_secs);
        cfg.eager_init = parse_env_bool("REEL_DB_EAGER_INIT", cfg.eager_init);
        cfg.migrate_on_start = parse_env_bool("REEL_DB_MIGRATE_ON_START", cfg.migrate_on_start);

        cfg
    }
}

pub struct Db {
    cfg: DbConfig,
    pool: OnceCell<SqlitePool>,
    migrated: OnceCell<()>,
}

impl Db {
    pub fn new(cfg: DbConfig) -> Self {
        Self {
            cfg,
            pool: OnceCell::new(),
            migrated: OnceCell::new(),
        }
    }

    /// - Eager mode: open the database and return an error if that fails.
    /// - Lazy mode: attempt the open; if it fails, log a warning and continue.
    pub async fn init(&self) -> Result<(), DbInitError> {
        if self.cfg.eager_init {
            let pool = self.try_open().await?;
            let _ = self.pool.set(pool);
            if self.cfg.migrate_on_start {
                if let Some(pool) = self.pool.get() {
                    self.ensure_migrated(pool).await?;
                }
            }
        } else {
            match self.try_open().await {
                Ok(pool) => {
                    let _ = self.pool.set(pool);
                    if self.cfg.migrate_on_start {
                        if let Some(pool) = self.pool.get() {
                            self.ensure_migrated(pool).await?;
                        }
                    }
                }
                Err(e) => {
                    // Lazy: allow deferred open
                    warn!(target: "reel_db", "database not available at startup (lazy): {e}");
                }
            }
        }
        Ok(())
    }

    /// Get a connection pool, opening the database on first use.
    /// If migrations are enabled, they run after the first successful open.
    pub async fn get_pool(&self) -> Result<&SqlitePool, DbInitError> {
        let pool = self
            .pool
            .get_or_try_init(|| async { self.try_open().await })
            .await?;

        if self.cfg.migrate_on_start {
            self.ensure_migrated(pool).await?;
        }

        Ok(pool)
    }

    /// A quick status probe. Uses a short timeout to avoid hanging when the
    /// database file is locked or degraded.
    pub async fn health_check(&self) -> HealthStatus {
        let Some(pool) = self.pool.get() else {
            return HealthStatus::NotInitialized;
        };

        match tokio::time::timeout(
            Duration::from_secs(1),
            sqlx::query("SELECT 1").execute(pool),
        )
        .await
        {
            Ok(Ok(_)) => HealthStatus::Ok,
            Ok(Err(e)) => HealthStatus::Error(e.to_string()),
            Err(_) => HealthStatus::Error("health check timed out".to_string()),
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.cfg.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(self.cfg.busy_timeout_secs))
    }

    async fn try_open(&self) -> Result<SqlitePool, DbInitError> {
        let result = SqlitePoolOptions::new()
            .max_connections(self.cfg.max_connections)
            .acquire_timeout(Duration::from_secs(self.cfg.acquire_timeout_secs))
            .connect_with(self.connect_options())
            .await;

        match result {
            Ok(pool) => {
                debug!(target: "reel_db", "opened database at {}", self.cfg.path.display());
                Ok(pool)
            }
            Err(e) => Err(DbInitError::Open {
                path: self.cfg.path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn ensure_migrated(&self, pool: &SqlitePool) -> Result<(), DbInitError> {
        self.migrated
            .get_or_try_init(|| async {
                info!(target: "reel_db", "running database migrations");
                MIGRATOR
                    .run(pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| DbInitError::Migrate(e.to_string()))
            })
            .await
            .map(|_| ())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbInitError {
    #[error("failed to open database at {path}: {message}")]
    Open { path: String, message: String },

    #[error("migrations failed: {0}")]
    Migrate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    NotInitialized,
    Ok,
    Error(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| {
            let s = s.trim().to_ascii_lowercase();
            matches!(s.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.path, PathBuf::from("reel.db"));
        assert_eq!(cfg.max_connections, 4);
        assert!(!cfg.eager_init);
        assert!(cfg.migrate_on_start);
    }

    #[tokio::test]
    async fn health_reports_not_initialized_before_open() {
        let db = Db::new(DbConfig::default());
        assert_eq!(db.health_check().await, HealthStatus::NotInitialized);
    }
}
