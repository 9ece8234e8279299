//! Domain types — habits, users and their Telegram accounts.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub type HabitId = i64;
pub type UserId = i64;

/// A tracked habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    /// Owning user.
    pub owner: UserId,
    /// Where the habit is performed.
    pub place: String,
    /// Local wall-clock time the habit should be performed at.
    pub time: NaiveTime,
    /// What to do.
    pub action: String,
    /// Pleasant habits only serve as rewards and are never reminded about.
    pub is_pleasant: bool,
    /// Pleasant habit performed as the reward for this one.
    pub linked_habit: Option<HabitId>,
    /// Recurrence is counted from this date, not from the last reminder.
    pub created_at: NaiveDate,
    /// Date of the last successful reminder.
    pub last_reminded_at: Option<NaiveDate>,
    /// Recurrence interval in days (1..=7).
    pub periodicity: u8,
    pub reward: Option<String>,
    /// Seconds needed to perform the habit (1..=120).
    pub execution_time: u16,
    /// Listed in the public habit feed.
    pub is_public: bool,
}

impl Habit {
    /// Reward text, ignoring blank values.
    pub fn reward_text(&self) -> Option<&str> {
        non_blank(self.reward.as_deref())
    }
}

/// Fields supplied when creating a habit. Owner, id and dates are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    pub place: String,
    pub time: NaiveTime,
    pub action: String,
    #[serde(default)]
    pub is_pleasant: bool,
    #[serde(default)]
    pub linked_habit: Option<HabitId>,
    #[serde(default = "default_periodicity")]
    pub periodicity: u8,
    #[serde(default)]
    pub reward: Option<String>,
    pub execution_time: u16,
    #[serde(default)]
    pub is_public: bool,
}

fn default_periodicity() -> u8 {
    1
}

/// Partial update of a habit. `None` leaves a field untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitPatch {
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub is_pleasant: Option<bool>,
    #[serde(default)]
    pub linked_habit: Option<Option<HabitId>>,
    #[serde(default)]
    pub periodicity: Option<u8>,
    #[serde(default)]
    pub reward: Option<Option<String>>,
    #[serde(default)]
    pub execution_time: Option<u16>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl HabitPatch {
    /// Merge the patch over an existing habit.
    /// Identity, owner and bookkeeping dates are never changed by a patch.
    pub fn apply_to(&self, habit: &Habit) -> Habit {
        let mut merged = habit.clone();
        if let Some(place) = &self.place {
            merged.place = place.clone();
        }
        if let Some(time) = self.time {
            merged.time = time;
        }
        if let Some(action) = &self.action {
            merged.action = action.clone();
        }
        if let Some(is_pleasant) = self.is_pleasant {
            merged.is_pleasant = is_pleasant;
        }
        if let Some(linked) = self.linked_habit {
            merged.linked_habit = linked;
        }
        if let Some(periodicity) = self.periodicity {
            merged.periodicity = periodicity;
        }
        if let Some(reward) = &self.reward {
            merged.reward = reward.clone();
        }
        if let Some(execution_time) = self.execution_time {
            merged.execution_time = execution_time;
        }
        if let Some(is_public) = self.is_public {
            merged.is_public = is_public;
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Telegram chat linked to a user — one per user, chat ids are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramAccount {
    pub user_id: UserId,
    pub chat_id: String,
}

pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit() -> Habit {
        Habit {
            id: 1,
            owner: 7,
            place: "home".into(),
            time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            action: "drink water".into(),
            is_pleasant: false,
            linked_habit: None,
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            last_reminded_at: Some(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap()),
            periodicity: 1,
            reward: Some("tea".into()),
            execution_time: 60,
            is_public: false,
        }
    }

    #[test]
    fn test_patch_keeps_bookkeeping_fields() {
        let patch = HabitPatch {
            action: Some("stretch".into()),
            reward: Some(None),
            linked_habit: Some(Some(9)),
            ..Default::default()
        };
        let merged = patch.apply_to(&habit());
        assert_eq!(merged.action, "stretch");
        assert_eq!(merged.reward, None);
        assert_eq!(merged.linked_habit, Some(9));
        assert_eq!(merged.owner, 7);
        assert_eq!(merged.last_reminded_at, habit().last_reminded_at);
        assert_eq!(merged.created_at, habit().created_at);
    }

    #[test]
    fn test_empty_patch() {
        assert!(HabitPatch::default().is_empty());
        assert_eq!(HabitPatch::default().apply_to(&habit()), habit());
    }

    #[test]
    fn test_blank_reward_is_none() {
        let mut h = habit();
        h.reward = Some("   ".into());
        assert_eq!(h.reward_text(), None);
    }
}
