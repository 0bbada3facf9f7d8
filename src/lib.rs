//! Coach Pulse — threshold alerting and scheduled meal reminders for
//! nutrition coaching.
//!
//! Two cooperating engines share one pattern per (coach, client) pair:
//! configuration store → time-window evaluator → dedup guard → action
//! emitter, driven by wall-clock polling loops.
//!
//! - The **reminder engine** fires at most one meal-time reminder per
//!   (date, meal type) per client, honoring quiet hours, active weekdays,
//!   and a configurable lead time.
//! - The **alert engine** compares days-since-check-in and adherence
//!   against per-pair thresholds and raises severity-graded alert records,
//!   keeping at most one open alert per kind per client.
//!
//! Delivery is best-effort and at-most-once: dedup state is committed
//! before the notification transport is invoked, and transport failures
//! are logged, never retried.

pub mod alerts;
pub mod config_store;
pub mod db;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod reminders;
pub mod schedule;
pub mod scheduler;

#[cfg(test)]
pub mod test_utils;

pub use db::{initialize_db, DbPool};
pub use errors::EngineError;
pub use models::{Alert, AlertConfig, AlertFilter, AlertKind, ReminderConfig, Severity};
pub use scheduler::SchedulerDriver;
