//! # HabitBell Core
//!
//! Shared vocabulary for the HabitBell workspace: domain types, the error
//! type, configuration, habit validation rules, and the traits the reminder
//! scheduler consumes (store, chat-target resolver, notifier, clock).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod validation;

pub use config::HabitBellConfig;
pub use error::{HabitBellError, Result};
pub use types::{Habit, HabitId, HabitPatch, NewHabit, TelegramAccount, User, UserId};
