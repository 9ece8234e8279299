//! Seams between the reminder scheduler and its collaborators.

pub mod clock;
pub mod notifier;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use notifier::Notifier;
pub use store::{ChatTargetResolver, HabitStore};
