use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::Channel;

/// ---------------------------------------------------------------------------
/// Alert Kind
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
  DaysWithoutCheckIn,
  AdherenceFloor,
}

impl std::fmt::Display for AlertKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::DaysWithoutCheckIn => write!(f, "days_without_check_in"),
      Self::AdherenceFloor => write!(f, "adherence_floor"),
    }
  }
}

impl std::str::FromStr for AlertKind {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "days_without_check_in" => Ok(Self::DaysWithoutCheckIn),
      "adherence_floor" => Ok(Self::AdherenceFloor),
      _ => Err(format!("Unknown alert kind: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Severity
/// ---------------------------------------------------------------------------

/// Ordered so that a larger breach never maps to a smaller variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl std::fmt::Display for Severity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Low => write!(f, "low"),
      Self::Medium => write!(f, "medium"),
      Self::High => write!(f, "high"),
    }
  }
}

impl std::str::FromStr for Severity {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      _ => Err(format!("Unknown severity: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Alert Record
/// ---------------------------------------------------------------------------

/// The values observed when the threshold crossing was detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertMeasurements {
  pub days_without_check_in: Option<i64>,
  pub current_adherence: Option<f64>,
  pub configured_threshold: Option<f64>,
}

/// A persisted threshold-crossing record.
///
/// Immutable after creation except for the acknowledge transition, which
/// sets `acknowledged` and `resolved_at` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub id: String,
  pub kind: AlertKind,
  pub coach_id: String,
  pub client_id: String,
  pub message: String,
  pub severity: Severity,
  pub created_at: DateTime<Utc>,
  pub acknowledged: bool,
  pub resolved_at: Option<DateTime<Utc>>,
  pub measurements: AlertMeasurements,
}

impl Alert {
  pub fn new(
    kind: AlertKind,
    coach_id: &str,
    client_id: &str,
    message: String,
    severity: Severity,
    measurements: AlertMeasurements,
  ) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      kind,
      coach_id: coach_id.to_string(),
      client_id: client_id.to_string(),
      message,
      severity,
      created_at: Utc::now(),
      acknowledged: false,
      resolved_at: None,
      measurements,
    }
  }
}

/// Optional filters for querying persisted alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
  pub coach_id: Option<String>,
  pub client_id: Option<String>,
  pub acknowledged: Option<bool>,
}

/// What the emitter hands to the notification transport.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
  pub channel: Channel,
  pub client_id: String,
  pub message: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_severity_ordering() {
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
  }

  #[test]
  fn test_alert_kind_roundtrip() {
    for kind in [AlertKind::DaysWithoutCheckIn, AlertKind::AdherenceFloor] {
      let parsed: AlertKind = kind.to_string().parse().unwrap();
      assert_eq!(parsed, kind);
    }
  }

  #[test]
  fn test_new_alert_starts_open() {
    let alert = Alert::new(
      AlertKind::AdherenceFloor,
      "coach-1",
      "client-1",
      "40% adherence is below configured 60%".to_string(),
      Severity::Medium,
      AlertMeasurements::default(),
    );

    assert!(!alert.acknowledged);
    assert!(alert.resolved_at.is_none());
    assert!(!alert.id.is_empty());
  }
}
