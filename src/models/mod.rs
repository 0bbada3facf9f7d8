pub mod alert;
pub mod config;

pub use alert::{Alert, AlertFilter, AlertKind, AlertMeasurements, Notification, Severity};
pub use config::{
  AlertConfig, Channel, MealSlot, MealType, QuietHours, ReminderConfig, Weekday,
};
