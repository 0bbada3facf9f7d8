use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Failure taxonomy for the alerting and reminder engine.
///
/// Everything that happens inside a scheduled tick is caught at the tick
/// boundary and logged; none of these stop the timers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The backing store cannot be read or written.
  #[error("Storage unavailable: {0}")]
  StorageUnavailable(#[from] sqlx::Error),

  /// The notification transport failed. Logged, never retried.
  #[error("Notification delivery failed: {0}")]
  NotificationDeliveryFailed(String),

  /// Rejected at the configuration-write boundary.
  #[error("Invalid config: {0}")]
  InvalidConfig(String),

  #[error("Missing configuration: {0}")]
  MissingConfig(String),
}

impl Serialize for EngineError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
