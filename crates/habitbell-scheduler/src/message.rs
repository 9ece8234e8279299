//! Reminder text.

use habitbell_core::Habit;

/// Build the reminder text for a due habit.
///
/// At most one reward line is added: the habit's own reward, or else the
/// action of its linked pleasant habit. Reward and link should never both be
/// set; if they are, the reward wins.
pub fn compose_reminder(habit: &Habit, linked_action: Option<&str>) -> String {
    let mut text = format!(
        "⏰ Reminder: {} in {} at {}",
        habit.action.trim(),
        habit.place.trim(),
        habit.time.format("%H:%M")
    );

    if let Some(reward) = habit.reward_text() {
        text.push_str(&format!("\n🎁 Reward: {}", reward.trim()));
    } else if let Some(action) = linked_action.filter(|a| !a.trim().is_empty()) {
        text.push_str(&format!("\n🎁 Afterwards: {}", action.trim()));
    }

    text
}
