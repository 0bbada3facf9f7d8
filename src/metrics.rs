//! Behavioral metrics for the alert engine
//!
//! The engine only needs two numbers per client: days since the last
//! nutrition check-in and the current adherence percentage. They come from
//! a [`MetricsProvider`] so the data layer stays swappable; the bundled
//! implementation reads the `check_ins` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::errors::EngineError;

/// ---------------------------------------------------------------------------
/// Provider Contract
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientMetrics {
  pub days_without_check_in: i64,
  pub current_adherence_percent: f64,
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
  /// `None` means the client has no measurable history yet; the alert
  /// engine skips such clients instead of alerting on missing data.
  async fn current_metrics(&self, client_id: &str)
    -> Result<Option<ClientMetrics>, EngineError>;
}

/// ---------------------------------------------------------------------------
/// Check-In Recording
/// ---------------------------------------------------------------------------

/// Record a nutrition check-in. Adherence is clamped to 0..=100 on write.
pub async fn record_check_in(
  pool: &SqlitePool,
  client_id: &str,
  checked_in_at: DateTime<Utc>,
  adherence_percent: f64,
  notes: Option<&str>,
) -> Result<i64, EngineError> {
  let adherence = adherence_percent.clamp(0.0, 100.0);

  let result = sqlx::query(
    r#"
    INSERT INTO check_ins (client_id, checked_in_at, adherence_percent, notes)
    VALUES (?1, ?2, ?3, ?4)
    "#,
  )
  .bind(client_id)
  .bind(checked_in_at)
  .bind(adherence)
  .bind(notes)
  .execute(pool)
  .await?;

  Ok(result.last_insert_rowid())
}

/// ---------------------------------------------------------------------------
/// SQLite-Backed Provider
/// ---------------------------------------------------------------------------

pub struct SqliteMetricsProvider {
  pool: SqlitePool,
}

impl SqliteMetricsProvider {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl MetricsProvider for SqliteMetricsProvider {
  async fn current_metrics(
    &self,
    client_id: &str,
  ) -> Result<Option<ClientMetrics>, EngineError> {
    // MAX() yields a single row with NULL when the client has no history
    let last: (Option<DateTime<Utc>>,) = sqlx::query_as(
      "SELECT MAX(checked_in_at) FROM check_ins WHERE client_id = ?1",
    )
    .bind(client_id)
    .fetch_one(&self.pool)
    .await?;

    let Some(last_check_in) = last.0 else {
      return Ok(None);
    };

    let days_without_check_in = (Utc::now() - last_check_in).num_days();

    // Adherence over the trailing week; falls back to the latest check-in
    // when the week is empty.
    let week_ago = Utc::now() - chrono::Duration::days(7);
    let weekly: (Option<f64>,) = sqlx::query_as(
      r#"
      SELECT AVG(adherence_percent)
      FROM check_ins
      WHERE client_id = ?1 AND checked_in_at >= ?2
      "#,
    )
    .bind(client_id)
    .bind(week_ago)
    .fetch_one(&self.pool)
    .await?;

    let current_adherence_percent = match weekly.0 {
      Some(avg) => avg,
      None => {
        let latest: (f64,) = sqlx::query_as(
          r#"
          SELECT adherence_percent
          FROM check_ins
          WHERE client_id = ?1
          ORDER BY checked_in_at DESC
          LIMIT 1
          "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;
        latest.0
      }
    };

    Ok(Some(ClientMetrics {
      days_without_check_in,
      current_adherence_percent,
    }))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
