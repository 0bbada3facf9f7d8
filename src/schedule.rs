//! Time-Window Evaluator
//!
//! Pure functions over `(now, config)` that decide whether the current
//! instant is eligible for a reminder. Deterministic by construction: the
//! caller supplies `now`, nothing here reads the clock.

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::models::config::{MealSlot, QuietHours, Weekday};
use crate::models::MealType;

/// Width of the eligibility window. Lets a coarse polling loop (one tick
/// every few minutes) catch the fire instant without second-level precision.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 5;

/// ---------------------------------------------------------------------------
/// Quiet Hours
/// ---------------------------------------------------------------------------

/// Inside the `[start, end)` window? When `start > end` the window wraps
/// across midnight: inside means `now >= start OR now < end`.
pub fn is_quiet_hours(now: NaiveDateTime, quiet_hours: Option<&QuietHours>) -> bool {
  let Some(q) = quiet_hours else {
    return false;
  };
  if !q.enabled {
    return false;
  }

  let t = now.time();
  if q.start <= q.end {
    t >= q.start && t < q.end
  } else {
    t >= q.start || t < q.end
  }
}

/// ---------------------------------------------------------------------------
/// Weekday Gating
/// ---------------------------------------------------------------------------

pub fn is_active_weekday(now: NaiveDateTime, active_weekdays: &[Weekday]) -> bool {
  active_weekdays.contains(&Weekday::from(now.weekday()))
}

/// ---------------------------------------------------------------------------
/// Fire Instant
/// ---------------------------------------------------------------------------

/// The next instant this slot should fire: `time_of_day - lead_minutes`
/// today, rolled forward to tomorrow if that instant is already past.
pub fn next_fire_instant(
  now: NaiveDateTime,
  slot: &MealSlot,
  lead_minutes: u32,
) -> NaiveDateTime {
  let today = now.date().and_time(slot.time_of_day) - Duration::minutes(i64::from(lead_minutes));
  if today < now {
    today + Duration::days(1)
  } else {
    today
  }
}

/// True when `0 <= fire_instant - now <= tolerance_minutes`.
pub fn is_eligible_now(
  now: NaiveDateTime,
  fire_instant: NaiveDateTime,
  tolerance_minutes: i64,
) -> bool {
  let delta = fire_instant - now;
  delta >= Duration::zero() && delta <= Duration::minutes(tolerance_minutes)
}

/// Dedup key for one firing: `"{date}_{meal_type}"`, dated by the fire
/// instant (not by `now`, which may still be on the previous day).
pub fn dispatch_key(fire_instant: NaiveDateTime, meal_type: MealType) -> String {
  format!("{}_{}", fire_instant.date().format("%Y-%m-%d"), meal_type)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
