//! Due-habit rules: recurrence from the creation date, the per-day dedup
//! guard, and the ±1-minute due window.
//!
//! A habit is due at `now` when all of these hold:
//! - it is not pleasant;
//! - `(today - created_at) mod periodicity == 0` with a non-negative day count;
//! - it has not been reminded today;
//! - `today + time` lies in `[minute_start - 1min, minute_start + 1min)`,
//!   where `minute_start` is `now` truncated to the minute.
//!
//! The window lets a tick that fires a minute late still catch the habit;
//! the dedup guard keeps the early and the late tick from both sending.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use habitbell_core::Habit;

/// Half-width of the due window, in minutes.
pub const DUE_WINDOW_MINUTES: i64 = 1;

/// Why a habit was or was not picked for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Due,
    Pleasant,
    /// `created_at` lies after today.
    CreatedInFuture,
    /// Today is not a multiple of the periodicity away from `created_at`.
    OffCycle,
    AlreadyReminded,
    OutsideWindow,
}

/// Whole days between creation and `today`; negative when created in the future.
pub fn days_since_created(habit: &Habit, today: NaiveDate) -> i64 {
    (today - habit.created_at).num_days()
}

/// Recurrence check only.
pub fn recurs_on(habit: &Habit, today: NaiveDate) -> Eligibility {
    let days = days_since_created(habit, today);
    if days < 0 {
        return Eligibility::CreatedInFuture;
    }
    if habit.periodicity == 0 || days % i64::from(habit.periodicity) != 0 {
        return Eligibility::OffCycle;
    }
    Eligibility::Due
}

/// Whether `time` today falls into the due window around `now`.
pub fn in_due_window(time: NaiveTime, now: DateTime<FixedOffset>) -> bool {
    let local = now.naive_local();
    let minute_start = truncate_to_minute(local);
    let window = Duration::minutes(DUE_WINDOW_MINUTES);
    let scheduled = now.date_naive().and_time(time);
    minute_start - window <= scheduled && scheduled < minute_start + window
}

/// Full eligibility check for one habit at `now`.
pub fn evaluate(habit: &Habit, now: DateTime<FixedOffset>) -> Eligibility {
    let today = now.date_naive();
    if habit.is_pleasant {
        return Eligibility::Pleasant;
    }
    match recurs_on(habit, today) {
        Eligibility::Due => {}
        other => return other,
    }
    if habit.last_reminded_at == Some(today) {
        return Eligibility::AlreadyReminded;
    }
    if !in_due_window(habit.time, now) {
        return Eligibility::OutsideWindow;
    }
    Eligibility::Due
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
