//! # HabitBell Scheduler
//!
//! Once-a-minute reminder selection for habits.
//!
//! ## Architecture
//! ```text
//! spawn_reminder_loop (tokio interval, 60s)
//!   └── ReminderSelector::run(now)
//!         ├── HabitStore::list_non_pleasant_habits
//!         ├── due::evaluate      recurrence, dedup guard, ±1 min window
//!         ├── ChatTargetResolver::chat_id_for(owner)
//!         ├── message::compose_reminder
//!         ├── HabitStore::update_last_reminded_at   claim today's send
//!         ├── Notifier::send     bounded by a per-call timeout
//!         └── HabitStore::revert_last_reminded_at   release the claim on failure
//! ```

pub mod due;
pub mod engine;
pub mod message;

pub use due::{Eligibility, evaluate};
pub use engine::{Outcome, ReminderSelector, RunReport, spawn_reminder_loop};
pub use message::compose_reminder;
