use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// ---------------------------------------------------------------------------
/// Serde helper: "HH:MM" wall-clock times
/// ---------------------------------------------------------------------------

pub mod hhmm {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer};

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&time.format(FORMAT).to_string())
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
  }
}

/// ---------------------------------------------------------------------------
/// Meal Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
  Breakfast,
  Lunch,
  Snack,
  Dinner,
  Other,
}

impl std::fmt::Display for MealType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Breakfast => write!(f, "breakfast"),
      Self::Lunch => write!(f, "lunch"),
      Self::Snack => write!(f, "snack"),
      Self::Dinner => write!(f, "dinner"),
      Self::Other => write!(f, "other"),
    }
  }
}

impl std::str::FromStr for MealType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "breakfast" => Ok(Self::Breakfast),
      "lunch" => Ok(Self::Lunch),
      "snack" => Ok(Self::Snack),
      "dinner" => Ok(Self::Dinner),
      "other" => Ok(Self::Other),
      _ => Err(format!("Unknown meal type: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Notification Channel
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
  Push,
  Email,
  Both,
}

impl std::fmt::Display for Channel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Push => write!(f, "push"),
      Self::Email => write!(f, "email"),
      Self::Both => write!(f, "both"),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Weekdays
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
  Mon,
  Tue,
  Wed,
  Thu,
  Fri,
  Sat,
  Sun,
}

impl Weekday {
  pub const ALL: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
  ];
}

impl From<chrono::Weekday> for Weekday {
  fn from(day: chrono::Weekday) -> Self {
    match day {
      chrono::Weekday::Mon => Self::Mon,
      chrono::Weekday::Tue => Self::Tue,
      chrono::Weekday::Wed => Self::Wed,
      chrono::Weekday::Thu => Self::Thu,
      chrono::Weekday::Fri => Self::Fri,
      chrono::Weekday::Sat => Self::Sat,
      chrono::Weekday::Sun => Self::Sun,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Reminder Configuration
/// ---------------------------------------------------------------------------

/// One scheduled meal for a client. Keyed by `meal_type`; insertion order of
/// the surrounding schedule is preserved through save/load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
  pub meal_type: MealType,
  #[serde(with = "hhmm")]
  pub time_of_day: NaiveTime,
  pub active: bool,
}

/// Daily do-not-disturb window. `start > end` wraps across midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
  #[serde(with = "hhmm")]
  pub start: NaiveTime,
  #[serde(with = "hhmm")]
  pub end: NaiveTime,
  pub enabled: bool,
}

/// Per (coach, client) reminder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
  pub enabled: bool,
  pub meal_schedule: Vec<MealSlot>,
  /// Minutes before `time_of_day` the reminder should fire.
  pub lead_minutes: u32,
  pub channel: Channel,
  pub active_weekdays: Vec<Weekday>,
  pub quiet_hours: Option<QuietHours>,
}

impl Default for ReminderConfig {
  /// Defaults returned on first read: reminders off, every slot present but
  /// inactive at the standard times.
  fn default() -> Self {
    let slot = |meal_type, h, m| MealSlot {
      meal_type,
      time_of_day: NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default(),
      active: false,
    };
    Self {
      enabled: false,
      meal_schedule: vec![
        slot(MealType::Breakfast, 8, 0),
        slot(MealType::Lunch, 13, 0),
        slot(MealType::Snack, 17, 0),
        slot(MealType::Dinner, 20, 30),
      ],
      lead_minutes: 15,
      channel: Channel::Both,
      active_weekdays: Weekday::ALL.to_vec(),
      quiet_hours: None,
    }
  }
}

impl ReminderConfig {
  /// Write-boundary validation: at most one slot per meal type.
  pub fn validate(&self) -> Result<(), EngineError> {
    let mut seen: Vec<MealType> = Vec::new();
    for slot in &self.meal_schedule {
      if seen.contains(&slot.meal_type) {
        return Err(EngineError::InvalidConfig(format!(
          "Duplicate meal slot: {}",
          slot.meal_type
        )));
      }
      seen.push(slot.meal_type);
    }
    Ok(())
  }

  /// Look up a slot by its meal type.
  pub fn slot(&self, meal_type: MealType) -> Option<&MealSlot> {
    self.meal_schedule.iter().find(|s| s.meal_type == meal_type)
  }
}

/// ---------------------------------------------------------------------------
/// Alert Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaysWithoutCheckInRule {
  pub enabled: bool,
  pub threshold_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceFloorRule {
  pub enabled: bool,
  pub threshold_percent: f64,
}

/// Per (coach, client) alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
  pub enabled: bool,
  pub days_without_check_in: DaysWithoutCheckInRule,
  pub adherence_floor: AdherenceFloorRule,
  pub channel: Channel,
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      days_without_check_in: DaysWithoutCheckInRule {
        enabled: false,
        threshold_days: 3,
      },
      adherence_floor: AdherenceFloorRule {
        enabled: false,
        threshold_percent: 60.0,
      },
      channel: Channel::Both,
    }
  }
}

impl AlertConfig {
  /// Validate and clamp at the write boundary. The adherence threshold is
  /// clamped to 0..=100 rather than rejected; a zero day threshold is a
  /// caller bug and is rejected.
  pub fn normalized(mut self) -> Result<Self, EngineError> {
    if self.days_without_check_in.threshold_days < 1 {
      return Err(EngineError::InvalidConfig(
        "threshold_days must be at least 1".to_string(),
      ));
    }
    self.adherence_floor.threshold_percent =
      self.adherence_floor.threshold_percent.clamp(0.0, 100.0);
    Ok(self)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_reminder_config_has_one_slot_per_meal() {
    let config = ReminderConfig::default();
    assert!(!config.enabled);
    assert_eq!(config.meal_schedule.len(), 4);
    assert!(config.meal_schedule.iter().all(|s| !s.active));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_duplicate_meal_slot_rejected() {
    let mut config = ReminderConfig::default();
    config.meal_schedule.push(MealSlot {
      meal_type: MealType::Lunch,
      time_of_day: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
      active: true,
    });

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("lunch"), "got: {}", err);
  }

  #[test]
  fn test_alert_config_clamps_adherence_threshold() {
    let mut config = AlertConfig::default();
    config.adherence_floor.threshold_percent = 140.0;

    let normalized = config.normalized().expect("Should normalize");
    assert_eq!(normalized.adherence_floor.threshold_percent, 100.0);
  }

  #[test]
  fn test_alert_config_rejects_zero_day_threshold() {
    let mut config = AlertConfig::default();
    config.days_without_check_in.threshold_days = 0;

    assert!(config.normalized().is_err());
  }

  #[test]
  fn test_meal_slot_time_serializes_as_hhmm() {
    let slot = MealSlot {
      meal_type: MealType::Dinner,
      time_of_day: NaiveTime::from_hms_opt(20, 30, 0).unwrap(),
      active: true,
    };
    let json = serde_json::to_string(&slot).unwrap();
    assert!(json.contains("\"20:30\""), "got: {}", json);

    let parsed: MealSlot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, slot);
  }
}
