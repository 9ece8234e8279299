//! Notification channels for HabitBell.

pub mod telegram;

pub use telegram::TelegramNotifier;
