//! Storage seams: habits and the chat targets of their owners.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Habit, HabitId, UserId};

/// Habit storage as seen by the reminder scheduler.
#[async_trait]
pub trait HabitStore: Send + Sync {
    /// Every habit that is not pleasant, in no particular order.
    async fn list_non_pleasant_habits(&self) -> Result<Vec<Habit>>;

    async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>>;

    /// Claim today's reminder: set `last_reminded_at = date` and nothing else,
    /// unless it already equals `date`. Returns whether this caller got the claim;
    /// `false` means another runner already reminded (or is reminding) today.
    async fn update_last_reminded_at(&self, id: HabitId, date: NaiveDate) -> Result<bool>;

    /// Give back a claim after a failed delivery: restore `previous`, but only
    /// while `last_reminded_at` still equals `date`.
    async fn revert_last_reminded_at(
        &self,
        id: HabitId,
        date: NaiveDate,
        previous: Option<NaiveDate>,
    ) -> Result<()>;
}

/// Resolves the notification target (Telegram chat id) of a user.
#[async_trait]
pub trait ChatTargetResolver: Send + Sync {
    async fn chat_id_for(&self, user: UserId) -> Result<Option<String>>;
}
