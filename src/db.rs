use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::errors::EngineError;

pub type DbPool = SqlitePool;

const DB_PATH_ENV: &str = "COACH_PULSE_DB";
const DEFAULT_DB_FILE: &str = "coach-pulse.db";

/// Resolve the database file path from `COACH_PULSE_DB`, falling back to
/// `./coach-pulse.db`.
fn db_path() -> PathBuf {
  env::var(DB_PATH_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_FILE))
}

/// Initialize the database connection pool and run migrations.
pub async fn initialize_db() -> Result<DbPool, EngineError> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let path = db_path();
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent).map_err(|e| EngineError::StorageUnavailable(e.into()))?;
    }
  }

  let db_url = format!("sqlite://{}?mode=rwc", path.display());
  connect(&db_url).await
}

/// Connect to an explicit database URL and run migrations.
pub async fn connect(db_url: &str) -> Result<DbPool, EngineError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(db_url)
    .await?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .map_err(sqlx::Error::from)?;

  Ok(pool)
}
