//! Scheduler Driver
//!
//! Wall-clock polling loops, one reminder task and one alert task per
//! started (coach, client) pair. Every tick is independent and idempotent:
//! all carry-over state lives in the dedup guard's backing store, so a
//! failed or skipped tick needs no recovery beyond waiting for the next
//! one. Tick errors are caught and logged; they never stop the timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alerts::verify_and_create_alerts;
use crate::metrics::MetricsProvider;
use crate::notify::Notifier;
use crate::reminders::verify_and_send_reminders;

/// Reminder checks poll finer than the eligibility tolerance window.
pub const REMINDER_TICK_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Alert thresholds move on a scale of days; hourly is plenty.
pub const ALERT_TICK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// ---------------------------------------------------------------------------
/// Driver
/// ---------------------------------------------------------------------------

struct PairTasks {
  reminder: JoinHandle<()>,
  alert: JoinHandle<()>,
}

/// Multi-tenant fan-out over (coach, client) pairs. Stores and collaborators
/// are injected; the driver owns nothing but timers.
pub struct SchedulerDriver {
  pool: SqlitePool,
  notifier: Arc<dyn Notifier>,
  metrics: Arc<dyn MetricsProvider>,
  reminder_interval: Duration,
  alert_interval: Duration,
  pairs: Mutex<HashMap<(String, String), PairTasks>>,
}

impl SchedulerDriver {
  pub fn new(
    pool: SqlitePool,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsProvider>,
  ) -> Self {
    Self {
      pool,
      notifier,
      metrics,
      reminder_interval: REMINDER_TICK_INTERVAL,
      alert_interval: ALERT_TICK_INTERVAL,
      pairs: Mutex::new(HashMap::new()),
    }
  }

  /// Override the polling cadence (tests run with millisecond intervals).
  pub fn with_intervals(mut self, reminder: Duration, alert: Duration) -> Self {
    self.reminder_interval = reminder;
    self.alert_interval = alert;
    self
  }

  /// Begin polling for a pair. Idempotent: returns false if the pair is
  /// already running.
  pub fn start_pair(&self, coach_id: &str, client_id: &str) -> bool {
    let key = (coach_id.to_string(), client_id.to_string());
    let mut pairs = self.pairs.lock().expect("scheduler pair map poisoned");
    if pairs.contains_key(&key) {
      return false;
    }

    let reminder = self.spawn_reminder_loop(coach_id, client_id);
    let alert = self.spawn_alert_loop(coach_id, client_id);
    pairs.insert(key, PairTasks { reminder, alert });

    info!(coach_id, client_id, "Scheduler started for pair");
    true
  }

  /// Cancel future firings for a pair. An in-flight tick is not rolled
  /// back. Idempotent: returns false if the pair was not running.
  pub fn stop_pair(&self, coach_id: &str, client_id: &str) -> bool {
    let key = (coach_id.to_string(), client_id.to_string());
    let mut pairs = self.pairs.lock().expect("scheduler pair map poisoned");
    match pairs.remove(&key) {
      Some(tasks) => {
        tasks.reminder.abort();
        tasks.alert.abort();
        info!(coach_id, client_id, "Scheduler stopped for pair");
        true
      }
      None => false,
    }
  }

  pub fn stop_all(&self) {
    let mut pairs = self.pairs.lock().expect("scheduler pair map poisoned");
    for (_, tasks) in pairs.drain() {
      tasks.reminder.abort();
      tasks.alert.abort();
    }
  }

  pub fn is_running(&self, coach_id: &str, client_id: &str) -> bool {
    let key = (coach_id.to_string(), client_id.to_string());
    self
      .pairs
      .lock()
      .expect("scheduler pair map poisoned")
      .contains_key(&key)
  }

  pub fn running_pairs(&self) -> usize {
    self.pairs.lock().expect("scheduler pair map poisoned").len()
  }

  fn spawn_reminder_loop(&self, coach_id: &str, client_id: &str) -> JoinHandle<()> {
    let pool = self.pool.clone();
    let notifier = Arc::clone(&self.notifier);
    let coach = coach_id.to_string();
    let client = client_id.to_string();
    let period = self.reminder_interval;

    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let now = Local::now().naive_local();
        if let Err(e) =
          verify_and_send_reminders(&pool, notifier.as_ref(), &coach, &client, now).await
        {
          warn!(coach_id = %coach, client_id = %client, error = %e, "Reminder tick failed");
        }
      }
    })
  }

  fn spawn_alert_loop(&self, coach_id: &str, client_id: &str) -> JoinHandle<()> {
    let pool = self.pool.clone();
    let notifier = Arc::clone(&self.notifier);
    let metrics = Arc::clone(&self.metrics);
    let coach = coach_id.to_string();
    let client = client_id.to_string();
    let period = self.alert_interval;

    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        if let Err(e) =
          verify_and_create_alerts(&pool, metrics.as_ref(), notifier.as_ref(), &coach, &client)
            .await
        {
          warn!(coach_id = %coach, client_id = %client, error = %e, "Alert tick failed");
        }
      }
    })
  }
}

impl Drop for SchedulerDriver {
  fn drop(&mut self) {
    self.stop_all();
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
