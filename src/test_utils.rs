//! Test utilities and helpers for integration and unit testing
//!
//! Common infrastructure: in-memory database setup/teardown, config
//! factories, and recording fakes for the notifier and metrics provider.

use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::EngineError;
use crate::metrics::{ClientMetrics, MetricsProvider};
use crate::models::{AlertConfig, Channel, ReminderConfig};
use crate::notify::Notifier;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Config Factories
/// ---------------------------------------------------------------------------

/// Reminder config with every default slot active and reminders on.
/// Breakfast 08:00 with the default 15-minute lead fires at 07:45.
pub fn active_reminder_config() -> ReminderConfig {
  let mut config = ReminderConfig::default();
  config.enabled = true;
  for slot in &mut config.meal_schedule {
    slot.active = true;
  }
  config
}

/// Alert config with both rules on at the default thresholds (3 days, 60%).
pub fn enabled_alert_config() -> AlertConfig {
  let mut config = AlertConfig::default();
  config.enabled = true;
  config.days_without_check_in.enabled = true;
  config.adherence_floor.enabled = true;
  config
}

/// ---------------------------------------------------------------------------
/// Recording Notifier
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
  pub channel: Channel,
  pub client_id: String,
  pub message: String,
}

/// Captures every notify call; optionally fails each one to exercise the
/// best-effort delivery path.
#[derive(Default)]
pub struct RecordingNotifier {
  sent: Mutex<Vec<SentNotification>>,
  fail: bool,
}

impl RecordingNotifier {
  pub fn failing() -> Self {
    Self {
      sent: Mutex::new(Vec::new()),
      fail: true,
    }
  }

  pub fn sent(&self) -> Vec<SentNotification> {
    self.sent.lock().expect("notifier log poisoned").clone()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn notify(
    &self,
    channel: Channel,
    client_id: &str,
    message: &str,
  ) -> Result<(), EngineError> {
    self
      .sent
      .lock()
      .expect("notifier log poisoned")
      .push(SentNotification {
        channel,
        client_id: client_id.to_string(),
        message: message.to_string(),
      });

    if self.fail {
      return Err(EngineError::NotificationDeliveryFailed(
        "test transport down".to_string(),
      ));
    }
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Fixed Metrics Provider
/// ---------------------------------------------------------------------------

enum FixedResponse {
  Metrics(ClientMetrics),
  NoData,
  Error,
}

/// Returns the same metrics for every client.
pub struct FixedMetrics {
  response: FixedResponse,
}

impl FixedMetrics {
  pub fn new(days_without_check_in: i64, current_adherence_percent: f64) -> Self {
    Self {
      response: FixedResponse::Metrics(ClientMetrics {
        days_without_check_in,
        current_adherence_percent,
      }),
    }
  }

  /// A client with no measurable history
  pub fn none() -> Self {
    Self {
      response: FixedResponse::NoData,
    }
  }

  /// A provider whose backing store is down
  pub fn erroring() -> Self {
    Self {
      response: FixedResponse::Error,
    }
  }
}

#[async_trait]
impl MetricsProvider for FixedMetrics {
  async fn current_metrics(
    &self,
    _client_id: &str,
  ) -> Result<Option<ClientMetrics>, EngineError> {
    match &self.response {
      FixedResponse::Metrics(m) => Ok(Some(*m)),
      FixedResponse::NoData => Ok(None),
      FixedResponse::Error => Err(EngineError::StorageUnavailable(sqlx::Error::PoolClosed)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN \
       ('reminder_configs', 'alert_configs', 'alerts', 'reminder_dispatch_log', 'check_ins')",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_recording_notifier_captures_calls() {
    let notifier = RecordingNotifier::default();
    notifier
      .notify(Channel::Push, "client-1", "hello")
      .await
      .expect("Should record");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].client_id, "client-1");

    let failing = RecordingNotifier::failing();
    assert!(failing.notify(Channel::Push, "client-1", "hi").await.is_err());
    assert_eq!(failing.sent().len(), 1, "Failing notifier still records");
  }
}
