//! Alert Engine
//!
//! Compares a client's behavioral signals (days since last check-in, current
//! adherence) against the configured thresholds and raises a severity-graded
//! alert when a threshold is crossed. At most one open alert per kind per
//! client: a repeat breach while one is open is silently suppressed until
//! the existing alert is acknowledged.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::config_store::get_alert_config;
use crate::errors::EngineError;
use crate::metrics::{ClientMetrics, MetricsProvider};
use crate::models::{Alert, AlertFilter, AlertKind, AlertMeasurements, Severity};
use crate::notify::Notifier;

/// ---------------------------------------------------------------------------
/// Severity Classifier
/// ---------------------------------------------------------------------------

/// Days-without-check-in grading: high at twice the threshold, medium at
/// one and a half times, low otherwise. The multipliers are product-tuned
/// constants, reproduced exactly.
pub fn classify_days_severity(measured_days: i64, threshold_days: u32) -> Severity {
  let measured = measured_days as f64;
  let threshold = f64::from(threshold_days);
  if measured >= 2.0 * threshold {
    Severity::High
  } else if measured >= 1.5 * threshold {
    Severity::Medium
  } else {
    Severity::Low
  }
}

/// Adherence grading by gap below the floor: high past 30 points, medium
/// past 15, low otherwise.
pub fn classify_adherence_severity(measured_percent: f64, threshold_percent: f64) -> Severity {
  let gap = threshold_percent - measured_percent;
  if gap > 30.0 {
    Severity::High
  } else if gap > 15.0 {
    Severity::Medium
  } else {
    Severity::Low
  }
}

fn days_message(days: i64) -> String {
  format!("{} days without check-ins", days)
}

fn adherence_message(measured: f64, threshold: f64) -> String {
  format!(
    "{:.0}% adherence is below the configured {:.0}%",
    measured, threshold
  )
}

/// ---------------------------------------------------------------------------
/// Alert Store
/// ---------------------------------------------------------------------------

type AlertRow = (
  String,
  String,
  String,
  String,
  String,
  String,
  DateTime<Utc>,
  bool,
  Option<DateTime<Utc>>,
  Option<i64>,
  Option<f64>,
  Option<f64>,
);

fn row_to_alert(row: AlertRow) -> Result<Alert, EngineError> {
  let (
    id,
    kind,
    coach_id,
    client_id,
    message,
    severity,
    created_at,
    acknowledged,
    resolved_at,
    days_without_check_in,
    current_adherence,
    configured_threshold,
  ) = row;

  Ok(Alert {
    id,
    kind: kind.parse().map_err(EngineError::InvalidConfig)?,
    coach_id,
    client_id,
    message,
    severity: severity.parse().map_err(EngineError::InvalidConfig)?,
    created_at,
    acknowledged,
    resolved_at,
    measurements: AlertMeasurements {
      days_without_check_in,
      current_adherence,
      configured_threshold,
    },
  })
}

const ALERT_COLUMNS: &str = "id, kind, coach_id, client_id, message, severity, created_at, \
   acknowledged, resolved_at, days_without_check_in, current_adherence, configured_threshold";

pub async fn create_alert(pool: &SqlitePool, alert: &Alert) -> Result<(), EngineError> {
  sqlx::query(
    r#"
    INSERT INTO alerts (
      id, kind, coach_id, client_id, message, severity, created_at,
      acknowledged, resolved_at, days_without_check_in, current_adherence,
      configured_threshold
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    "#,
  )
  .bind(&alert.id)
  .bind(alert.kind.to_string())
  .bind(&alert.coach_id)
  .bind(&alert.client_id)
  .bind(&alert.message)
  .bind(alert.severity.to_string())
  .bind(alert.created_at)
  .bind(alert.acknowledged)
  .bind(alert.resolved_at)
  .bind(alert.measurements.days_without_check_in)
  .bind(alert.measurements.current_adherence)
  .bind(alert.measurements.configured_threshold)
  .execute(pool)
  .await?;

  Ok(())
}

/// Is there an unacknowledged alert of this kind for the client?
pub async fn has_open_alert(
  pool: &SqlitePool,
  client_id: &str,
  kind: AlertKind,
) -> Result<bool, EngineError> {
  let count: (i64,) = sqlx::query_as(
    "SELECT COUNT(*) FROM alerts WHERE client_id = ?1 AND kind = ?2 AND acknowledged = 0",
  )
  .bind(client_id)
  .bind(kind.to_string())
  .fetch_one(pool)
  .await?;

  Ok(count.0 > 0)
}

/// Alerts matching the filter, newest first.
pub async fn query_alerts(
  pool: &SqlitePool,
  filter: &AlertFilter,
) -> Result<Vec<Alert>, EngineError> {
  let rows: Vec<AlertRow> = sqlx::query_as(&format!(
    r#"
    SELECT {}
    FROM alerts
    WHERE (?1 IS NULL OR coach_id = ?1)
      AND (?2 IS NULL OR client_id = ?2)
      AND (?3 IS NULL OR acknowledged = ?3)
    ORDER BY created_at DESC
    "#,
    ALERT_COLUMNS
  ))
  .bind(&filter.coach_id)
  .bind(&filter.client_id)
  .bind(filter.acknowledged)
  .fetch_all(pool)
  .await?;

  rows.into_iter().map(row_to_alert).collect()
}

/// Mark an alert acknowledged and resolved. The transition happens at most
/// once; returns false if the alert was already acknowledged (or unknown).
pub async fn acknowledge_alert(pool: &SqlitePool, alert_id: &str) -> Result<bool, EngineError> {
  let result = sqlx::query(
    r#"
    UPDATE alerts
    SET acknowledged = 1, resolved_at = ?1
    WHERE id = ?2 AND acknowledged = 0
    "#,
  )
  .bind(Utc::now())
  .bind(alert_id)
  .execute(pool)
  .await?;

  Ok(result.rows_affected() == 1)
}

/// ---------------------------------------------------------------------------
/// Verify and Create (one tick)
/// ---------------------------------------------------------------------------

/// One alert-engine pass for a (coach, client) pair: read config, measure,
/// compare, and raise whatever thresholds are crossed and not already open.
/// Returns the alerts created by this pass.
pub async fn verify_and_create_alerts(
  pool: &SqlitePool,
  metrics: &dyn MetricsProvider,
  notifier: &dyn Notifier,
  coach_id: &str,
  client_id: &str,
) -> Result<Vec<Alert>, EngineError> {
  let config = get_alert_config(pool, coach_id, client_id).await?;
  if !config.enabled {
    return Ok(Vec::new());
  }

  let Some(measured) = metrics.current_metrics(client_id).await? else {
    return Ok(Vec::new());
  };

  let mut created = Vec::new();

  if config.days_without_check_in.enabled {
    let threshold = config.days_without_check_in.threshold_days;
    if measured.days_without_check_in >= i64::from(threshold) {
      if let Some(alert) =
        raise_days_alert(pool, coach_id, client_id, &measured, threshold).await?
      {
        emit(notifier, config.channel, client_id, &alert).await;
        created.push(alert);
      }
    }
  }

  if config.adherence_floor.enabled {
    let threshold = config.adherence_floor.threshold_percent;
    if measured.current_adherence_percent < threshold {
      if let Some(alert) =
        raise_adherence_alert(pool, coach_id, client_id, &measured, threshold).await?
      {
        emit(notifier, config.channel, client_id, &alert).await;
        created.push(alert);
      }
    }
  }

  Ok(created)
}

async fn raise_days_alert(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
  measured: &ClientMetrics,
  threshold_days: u32,
) -> Result<Option<Alert>, EngineError> {
  if has_open_alert(pool, client_id, AlertKind::DaysWithoutCheckIn).await? {
    return Ok(None);
  }

  let alert = Alert::new(
    AlertKind::DaysWithoutCheckIn,
    coach_id,
    client_id,
    days_message(measured.days_without_check_in),
    classify_days_severity(measured.days_without_check_in, threshold_days),
    AlertMeasurements {
      days_without_check_in: Some(measured.days_without_check_in),
      current_adherence: None,
      configured_threshold: Some(f64::from(threshold_days)),
    },
  );
  create_alert(pool, &alert).await?;
  Ok(Some(alert))
}

async fn raise_adherence_alert(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
  measured: &ClientMetrics,
  threshold_percent: f64,
) -> Result<Option<Alert>, EngineError> {
  if has_open_alert(pool, client_id, AlertKind::AdherenceFloor).await? {
    return Ok(None);
  }

  let alert = Alert::new(
    AlertKind::AdherenceFloor,
    coach_id,
    client_id,
    adherence_message(measured.current_adherence_percent, threshold_percent),
    classify_adherence_severity(measured.current_adherence_percent, threshold_percent),
    AlertMeasurements {
      days_without_check_in: None,
      current_adherence: Some(measured.current_adherence_percent),
      configured_threshold: Some(threshold_percent),
    },
  );
  create_alert(pool, &alert).await?;
  Ok(Some(alert))
}

/// Best-effort delivery: the alert record is already persisted, a transport
/// failure is logged and swallowed.
async fn emit(
  notifier: &dyn Notifier,
  channel: crate::models::Channel,
  client_id: &str,
  alert: &Alert,
) {
  if let Err(e) = notifier.notify(channel, client_id, &alert.message).await {
    warn!(client_id, alert_id = %alert.id, error = %e, "Alert notification failed");
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
