//! Reminder Engine
//!
//! One pass per tick over a client's meal schedule: weekday and quiet-hours
//! gates first, then per-slot eligibility, then an atomic dedup claim so
//! each (date, meal type) fires at most once per client.
//!
//! The dedup key is claimed before delivery is attempted. A transport
//! failure therefore costs the notification, never a duplicate on the next
//! tick (at-most-once, best-effort).

use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::config_store::get_reminder_config;
use crate::errors::EngineError;
use crate::models::config::MealSlot;
use crate::notify::Notifier;
use crate::schedule::{
  dispatch_key, is_active_weekday, is_eligible_now, is_quiet_hours, next_fire_instant,
  DEFAULT_TOLERANCE_MINUTES,
};

/// Dispatch-log rows older than this are pruned during reminder ticks.
pub const DISPATCH_LOG_RETENTION_DAYS: i64 = 90;

/// ---------------------------------------------------------------------------
/// Dedup Guard (dispatch log)
/// ---------------------------------------------------------------------------

/// Claim a dispatch key for a client. `INSERT OR IGNORE` against the
/// primary key makes this an atomic check-and-set: exactly one caller wins
/// even if ticks overlap. Returns whether this call won the key.
pub async fn claim_dispatch_key(
  pool: &SqlitePool,
  client_id: &str,
  key: &str,
) -> Result<bool, EngineError> {
  let result = sqlx::query(
    r#"
    INSERT OR IGNORE INTO reminder_dispatch_log (client_id, dispatch_key, dispatched_at)
    VALUES (?1, ?2, ?3)
    "#,
  )
  .bind(client_id)
  .bind(key)
  .bind(Utc::now())
  .execute(pool)
  .await?;

  Ok(result.rows_affected() == 1)
}

pub async fn was_dispatched(
  pool: &SqlitePool,
  client_id: &str,
  key: &str,
) -> Result<bool, EngineError> {
  let count: (i64,) = sqlx::query_as(
    "SELECT COUNT(*) FROM reminder_dispatch_log WHERE client_id = ?1 AND dispatch_key = ?2",
  )
  .bind(client_id)
  .bind(key)
  .fetch_one(pool)
  .await?;

  Ok(count.0 > 0)
}

/// Drop dispatch-log rows past the retention window. Returns rows deleted.
pub async fn prune_dispatch_log(
  pool: &SqlitePool,
  retention_days: i64,
) -> Result<u64, EngineError> {
  let cutoff = Utc::now() - chrono::Duration::days(retention_days);
  let result = sqlx::query("DELETE FROM reminder_dispatch_log WHERE dispatched_at < ?1")
    .bind(cutoff)
    .execute(pool)
    .await?;

  Ok(result.rows_affected())
}

/// ---------------------------------------------------------------------------
/// Verify and Send (one tick)
/// ---------------------------------------------------------------------------

fn reminder_message(slot: &MealSlot) -> String {
  format!(
    "Time to log your {} (scheduled {})",
    slot.meal_type,
    slot.time_of_day.format("%H:%M")
  )
}

/// One reminder-engine pass for a (coach, client) pair at wall-clock `now`.
/// Returns the dispatch keys fired by this pass.
pub async fn verify_and_send_reminders(
  pool: &SqlitePool,
  notifier: &dyn Notifier,
  coach_id: &str,
  client_id: &str,
  now: NaiveDateTime,
) -> Result<Vec<String>, EngineError> {
  let config = get_reminder_config(pool, coach_id, client_id).await?;
  if !config.enabled {
    return Ok(Vec::new());
  }
  if !is_active_weekday(now, &config.active_weekdays) {
    return Ok(Vec::new());
  }
  // Quiet hours suppress every slot, eligible or not
  if is_quiet_hours(now, config.quiet_hours.as_ref()) {
    return Ok(Vec::new());
  }

  let pruned = prune_dispatch_log(pool, DISPATCH_LOG_RETENTION_DAYS).await?;
  if pruned > 0 {
    debug!(client_id, pruned, "Pruned dispatch log");
  }

  let mut fired = Vec::new();
  for slot in config.meal_schedule.iter().filter(|s| s.active) {
    let fire_instant = next_fire_instant(now, slot, config.lead_minutes);
    if !is_eligible_now(now, fire_instant, DEFAULT_TOLERANCE_MINUTES) {
      continue;
    }

    let key = dispatch_key(fire_instant, slot.meal_type);
    if !claim_dispatch_key(pool, client_id, &key).await? {
      continue; // already sent for this (date, meal type)
    }

    let message = reminder_message(slot);
    if let Err(e) = notifier.notify(config.channel, client_id, &message).await {
      warn!(client_id, key = %key, error = %e, "Reminder notification failed");
    }
    fired.push(key);
  }

  Ok(fired)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
