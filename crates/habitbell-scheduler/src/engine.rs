//! Reminder engine — picks the habits due this minute and notifies their owners.
//! One pass per tick; the loop in [`spawn_reminder_loop`] drives it once a minute.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use habitbell_core::config::SchedulerConfig;
use habitbell_core::traits::{ChatTargetResolver, Clock, HabitStore, Notifier};
use habitbell_core::{Habit, Result};

use crate::due::{self, Eligibility};
use crate::message::compose_reminder;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// What happened to one candidate habit during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    Skipped(Eligibility),
    /// Owner has no chat target.
    NoTarget,
    /// Notifier returned false or timed out.
    Failed,
    /// `last_reminded_at` could not be claimed, so nothing was sent.
    Unrecorded,
}

/// Per-pass counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub candidates: usize,
    pub sent: usize,
    pub skipped: usize,
    pub no_target: usize,
    pub failed: usize,
    pub unrecorded: usize,
    /// Another pass was still running; nothing was done.
    pub overlapped: bool,
}

impl RunReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::NoTarget => self.no_target += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Unrecorded => self.unrecorded += 1,
        }
    }
}

/// Selects due habits and delivers their reminders.
pub struct ReminderSelector {
    store: Arc<dyn HabitStore>,
    resolver: Arc<dyn ChatTargetResolver>,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
    max_concurrent: usize,
    /// Held for the duration of a pass; passes never overlap.
    run_guard: Mutex<()>,
}

impl ReminderSelector {
    pub fn new(
        store: Arc<dyn HabitStore>,
        resolver: Arc<dyn ChatTargetResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            resolver,
            notifier,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            run_guard: Mutex::new(()),
        }
    }

    /// Apply timeout and concurrency settings from config.
    pub fn configure(self, config: &SchedulerConfig) -> Self {
        self.with_send_timeout(Duration::from_secs(config.send_timeout_secs))
            .with_max_concurrent(config.max_concurrent_sends)
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// One pass at `now`; returns how many reminders were delivered and recorded.
    pub async fn run_once(&self, now: DateTime<FixedOffset>) -> Result<usize> {
        Ok(self.run(now).await?.sent)
    }

    /// One pass at `now` with the full breakdown.
    ///
    /// Only a failure to list candidates is returned as an error; every
    /// per-habit problem is counted in the report and the pass continues.
    pub async fn run(&self, now: DateTime<FixedOffset>) -> Result<RunReport> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::warn!("⏭️ Reminder pass at {now} skipped: previous pass still running");
            return Ok(RunReport {
                overlapped: true,
                ..Default::default()
            });
        };

        let today = now.date_naive();
        let habits = self.store.list_non_pleasant_habits().await?;
        let mut report = RunReport {
            candidates: habits.len(),
            ..Default::default()
        };

        let outcomes: Vec<Outcome> = stream::iter(habits)
            .map(|habit| self.process(habit, now, today))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        for outcome in outcomes {
            report.record(outcome);
        }

        if report.sent > 0 || report.failed > 0 || report.unrecorded > 0 {
            tracing::info!(
                "🔔 Reminder pass {}: sent={} failed={} unrecorded={} no_target={} (of {})",
                now.format("%Y-%m-%d %H:%M"),
                report.sent,
                report.failed,
                report.unrecorded,
                report.no_target,
                report.candidates
            );
        } else {
            tracing::debug!(
                "Reminder pass {}: nothing due (of {})",
                now.format("%Y-%m-%d %H:%M"),
                report.candidates
            );
        }

        Ok(report)
    }

    async fn process(&self, habit: Habit, now: DateTime<FixedOffset>, today: NaiveDate) -> Outcome {
        let eligibility = due::evaluate(&habit, now);
        if eligibility != Eligibility::Due {
            return Outcome::Skipped(eligibility);
        }

        let target = match self.resolver.chat_id_for(habit.owner).await {
            Ok(Some(chat_id)) if !chat_id.trim().is_empty() => chat_id,
            Ok(_) => {
                tracing::debug!("Habit {} due but user {} has no chat id", habit.id, habit.owner);
                return Outcome::NoTarget;
            }
            Err(e) => {
                tracing::warn!("⚠️ Chat id lookup failed for user {}: {e}", habit.owner);
                return Outcome::NoTarget;
            }
        };

        let linked_action = self.linked_action(&habit).await;
        let text = compose_reminder(&habit, linked_action.as_deref());

        // claim before sending so concurrent runners over one database send once
        match self.store.update_last_reminded_at(habit.id, today).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Habit {} already reminded for {today} by another runner", habit.id);
                return Outcome::Skipped(Eligibility::AlreadyReminded);
            }
            Err(e) => {
                tracing::error!("❌ Reminder for habit {} not sent, could not record it: {e}", habit.id);
                return Outcome::Unrecorded;
            }
        }

        let delivered =
            match tokio::time::timeout(self.send_timeout, self.notifier.send(&target, &text)).await {
                Ok(ok) => ok,
                Err(_) => {
                    tracing::warn!(
                        "⚠️ {} delivery for habit {} timed out after {:?}",
                        self.notifier.name(),
                        habit.id,
                        self.send_timeout
                    );
                    false
                }
            };
        if delivered {
            return Outcome::Sent;
        }

        match self
            .store
            .revert_last_reminded_at(habit.id, today, habit.last_reminded_at)
            .await
        {
            Ok(()) => {
                tracing::warn!("⚠️ Reminder for habit {} not delivered, will retry next tick", habit.id);
            }
            Err(e) => {
                tracing::error!(
                    "❌ Reminder for habit {} not delivered and its claim for {today} could not be released: {e}",
                    habit.id
                );
            }
        }
        Outcome::Failed
    }

    /// Action of the linked pleasant habit, only looked up when there is no reward.
    async fn linked_action(&self, habit: &Habit) -> Option<String> {
        if habit.reward_text().is_some() {
            return None;
        }
        let id = habit.linked_habit?;
        match self.store.get_habit(id).await {
            Ok(linked) => linked.map(|h| h.action),
            Err(e) => {
                tracing::warn!("⚠️ Failed to load linked habit {id}: {e}");
                None
            }
        }
    }
}

/// Run the reminder loop forever: one pass per `check_interval_secs`.
pub async fn spawn_reminder_loop(
    selector: Arc<ReminderSelector>,
    clock: Arc<dyn Clock>,
    check_interval_secs: u64,
) {
    tracing::info!("⏰ Reminder loop started (check every {}s)", check_interval_secs);

    let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let now = clock.now();
        if let Err(e) = selector.run(now).await {
            tracing::warn!("⚠️ Reminder pass at {now} failed: {e}");
        }
    }
}
