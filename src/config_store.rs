//! Configuration Store
//!
//! Durable keyed storage for reminder and alert settings, one row per
//! (coach, client) pair. Reads fall back to documented defaults when no row
//! exists; writes validate, then overwrite wholesale. Callers needing a
//! partial update must read-modify-write.

use sqlx::SqlitePool;

use crate::errors::EngineError;
use crate::models::{AlertConfig, ReminderConfig};

/// ---------------------------------------------------------------------------
/// Reminder Config
/// ---------------------------------------------------------------------------

pub async fn get_reminder_config(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
) -> Result<ReminderConfig, EngineError> {
  let row: Option<(String,)> = sqlx::query_as(
    "SELECT config_json FROM reminder_configs WHERE coach_id = ?1 AND client_id = ?2",
  )
  .bind(coach_id)
  .bind(client_id)
  .fetch_optional(pool)
  .await?;

  match row {
    Some((json,)) => serde_json::from_str(&json).map_err(|e| {
      EngineError::InvalidConfig(format!("Stored reminder config is malformed: {}", e))
    }),
    None => Ok(ReminderConfig::default()),
  }
}

pub async fn set_reminder_config(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
  config: &ReminderConfig,
) -> Result<(), EngineError> {
  config.validate()?;

  let json = serde_json::to_string(config)
    .map_err(|e| EngineError::InvalidConfig(format!("Failed to encode reminder config: {}", e)))?;

  sqlx::query(
    r#"
    INSERT INTO reminder_configs (coach_id, client_id, config_json, updated_at)
    VALUES (?1, ?2, ?3, datetime('now'))
    ON CONFLICT(coach_id, client_id) DO UPDATE SET
      config_json = excluded.config_json,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(coach_id)
  .bind(client_id)
  .bind(&json)
  .execute(pool)
  .await?;

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Alert Config
/// ---------------------------------------------------------------------------

pub async fn get_alert_config(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
) -> Result<AlertConfig, EngineError> {
  let row: Option<(String,)> = sqlx::query_as(
    "SELECT config_json FROM alert_configs WHERE coach_id = ?1 AND client_id = ?2",
  )
  .bind(coach_id)
  .bind(client_id)
  .fetch_optional(pool)
  .await?;

  match row {
    Some((json,)) => serde_json::from_str(&json).map_err(|e| {
      EngineError::InvalidConfig(format!("Stored alert config is malformed: {}", e))
    }),
    None => Ok(AlertConfig::default()),
  }
}

/// Clamps and validates before persisting; see [`AlertConfig::normalized`].
pub async fn set_alert_config(
  pool: &SqlitePool,
  coach_id: &str,
  client_id: &str,
  config: AlertConfig,
) -> Result<(), EngineError> {
  let config = config.normalized()?;

  let json = serde_json::to_string(&config)
    .map_err(|e| EngineError::InvalidConfig(format!("Failed to encode alert config: {}", e)))?;

  sqlx::query(
    r#"
    INSERT INTO alert_configs (coach_id, client_id, config_json, updated_at)
    VALUES (?1, ?2, ?3, datetime('now'))
    ON CONFLICT(coach_id, client_id) DO UPDATE SET
      config_json = excluded.config_json,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(coach_id)
  .bind(client_id)
  .bind(&json)
  .execute(pool)
  .await?;

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::config::{MealSlot, QuietHours};
  use crate::models::{Channel, MealType, Weekday};
  use crate::test_utils::{setup_test_db, teardown_test_db};
  use chrono::NaiveTime;

  #[tokio::test]
  async fn test_get_returns_defaults_when_absent() {
    let pool = setup_test_db().await;

    let reminders = get_reminder_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should read reminder config");
    assert_eq!(reminders, ReminderConfig::default());

    let alerts = get_alert_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should read alert config");
    assert_eq!(alerts, AlertConfig::default());
    assert_eq!(alerts.days_without_check_in.threshold_days, 3);
    assert_eq!(alerts.adherence_floor.threshold_percent, 60.0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_reminder_config_roundtrip() {
    let pool = setup_test_db().await;

    let config = ReminderConfig {
      enabled: true,
      meal_schedule: vec![
        MealSlot {
          meal_type: MealType::Dinner,
          time_of_day: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
          active: true,
        },
        MealSlot {
          meal_type: MealType::Breakfast,
          time_of_day: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
          active: false,
        },
      ],
      lead_minutes: 10,
      channel: Channel::Push,
      active_weekdays: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
      quiet_hours: Some(QuietHours {
        start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        enabled: true,
      }),
    };

    set_reminder_config(&pool, "coach-1", "client-1", &config)
      .await
      .expect("Should save");

    let loaded = get_reminder_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should reload");

    // Field-for-field equality, meal schedule in original order
    assert_eq!(loaded, config);
    assert_eq!(loaded.meal_schedule[0].meal_type, MealType::Dinner);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_set_overwrites_wholesale() {
    let pool = setup_test_db().await;

    let mut config = ReminderConfig::default();
    config.enabled = true;
    set_reminder_config(&pool, "coach-1", "client-1", &config)
      .await
      .expect("Should save");

    config.enabled = false;
    config.lead_minutes = 30;
    set_reminder_config(&pool, "coach-1", "client-1", &config)
      .await
      .expect("Should overwrite");

    let loaded = get_reminder_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should reload");
    assert!(!loaded.enabled);
    assert_eq!(loaded.lead_minutes, 30);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_set_alert_config_clamps_on_write() {
    let pool = setup_test_db().await;

    let mut config = AlertConfig::default();
    config.enabled = true;
    config.adherence_floor.threshold_percent = -20.0;

    set_alert_config(&pool, "coach-1", "client-1", config)
      .await
      .expect("Should save");

    let loaded = get_alert_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should reload");
    assert_eq!(loaded.adherence_floor.threshold_percent, 0.0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_invalid_reminder_config_rejected_at_write() {
    let pool = setup_test_db().await;

    let mut config = ReminderConfig::default();
    config.meal_schedule.push(MealSlot {
      meal_type: MealType::Breakfast,
      time_of_day: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
      active: true,
    });

    let result = set_reminder_config(&pool, "coach-1", "client-1", &config).await;
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));

    // Nothing was written
    let loaded = get_reminder_config(&pool, "coach-1", "client-1")
      .await
      .expect("Should read");
    assert_eq!(loaded, ReminderConfig::default());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_configs_are_keyed_per_pair() {
    let pool = setup_test_db().await;

    let mut config = ReminderConfig::default();
    config.enabled = true;
    set_reminder_config(&pool, "coach-1", "client-1", &config)
      .await
      .expect("Should save");

    let other = get_reminder_config(&pool, "coach-1", "client-2")
      .await
      .expect("Should read");
    assert!(!other.enabled, "Other pair should still see defaults");

    teardown_test_db(pool).await;
  }
}
