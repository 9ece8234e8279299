//! SQLite persistence for HabitBell.
//!
//! One store backs both sides of the app: ownership-scoped habit management
//! for users, and the narrow [`HabitStore`](habitbell_core::traits::HabitStore)
//! / [`ChatTargetResolver`](habitbell_core::traits::ChatTargetResolver) view
//! the reminder scheduler works through.

pub mod store;

pub use store::SqliteStore;
