//! Habit validation rules, applied on create and on (merged) update.
//!
//! - `place` and `action` not blank, text fields at most 255 characters
//! - `execution_time` within 1..=120 seconds
//! - `periodicity` within 1..=7 days
//! - a pleasant habit has neither reward nor linked habit
//! - any other habit has exactly one of reward / linked habit
//! - the linked habit exists, is pleasant and has the same owner

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Habit, HabitId, NewHabit, UserId, non_blank};

pub const MAX_EXECUTION_TIME_SECS: u16 = 120;
pub const MAX_PERIODICITY_DAYS: u8 = 7;
pub const MAX_TEXT_LEN: usize = 255;

/// Key used for errors that are not tied to a single field.
pub const GENERAL: &str = "habit";

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    /// A single failed field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Message recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        // first violation per field wins
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// The subset of habit fields the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub owner: UserId,
    pub place: &'a str,
    pub action: &'a str,
    pub is_pleasant: bool,
    pub reward: Option<&'a str>,
    pub linked_habit: Option<HabitId>,
    pub periodicity: u8,
    pub execution_time: u16,
}

impl<'a> Candidate<'a> {
    pub fn from_new(owner: UserId, habit: &'a NewHabit) -> Self {
        Self {
            owner,
            place: &habit.place,
            action: &habit.action,
            is_pleasant: habit.is_pleasant,
            reward: non_blank(habit.reward.as_deref()),
            linked_habit: habit.linked_habit,
            periodicity: habit.periodicity,
            execution_time: habit.execution_time,
        }
    }

    pub fn from_habit(habit: &'a Habit) -> Self {
        Self {
            owner: habit.owner,
            place: &habit.place,
            action: &habit.action,
            is_pleasant: habit.is_pleasant,
            reward: habit.reward_text(),
            linked_habit: habit.linked_habit,
            periodicity: habit.periodicity,
            execution_time: habit.execution_time,
        }
    }
}

/// Validate a habit. `linked` is the habit referenced by `linked_habit`,
/// looked up by the caller (`None` when it does not exist).
pub fn validate(candidate: &Candidate<'_>, linked: Option<&Habit>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    for (field, value) in [("place", candidate.place), ("action", candidate.action)] {
        if value.trim().is_empty() {
            errors.add(field, "must not be blank");
        }
    }
    for (field, value) in [
        ("place", Some(candidate.place)),
        ("action", Some(candidate.action)),
        ("reward", candidate.reward),
    ] {
        if value.is_some_and(|v| v.chars().count() > MAX_TEXT_LEN) {
            errors.add(field, format!("must be at most {MAX_TEXT_LEN} characters"));
        }
    }

    if candidate.execution_time == 0 || candidate.execution_time > MAX_EXECUTION_TIME_SECS {
        errors.add(
            "execution_time",
            format!("must be between 1 and {MAX_EXECUTION_TIME_SECS} seconds"),
        );
    }

    if candidate.periodicity == 0 || candidate.periodicity > MAX_PERIODICITY_DAYS {
        errors.add(
            "periodicity",
            format!("must be between 1 and {MAX_PERIODICITY_DAYS} days"),
        );
    }

    if candidate.is_pleasant {
        if candidate.reward.is_some() {
            errors.add("reward", "a pleasant habit cannot have a reward");
        }
        if candidate.linked_habit.is_some() {
            errors.add("linked_habit", "a pleasant habit cannot be linked to another habit");
        }
        return errors.into_result();
    }

    match (candidate.reward, candidate.linked_habit) {
        (None, None) => errors.add(GENERAL, "set either a reward or a linked pleasant habit"),
        (Some(_), Some(_)) => {
            errors.add(GENERAL, "a reward and a linked habit cannot both be set")
        }
        _ => {}
    }

    if let Some(linked_id) = candidate.linked_habit {
        match linked {
            None => errors.add("linked_habit", format!("habit {linked_id} does not exist")),
            Some(l) if !l.is_pleasant => {
                errors.add("linked_habit", "the linked habit must be pleasant")
            }
            Some(l) if l.owner != candidate.owner => {
                errors.add("linked_habit", "only your own habits can be linked")
            }
            Some(_) => {}
        }
    }

    errors.into_result()
}
