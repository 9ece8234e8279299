//! SQLite store for users, habits and Telegram accounts.
//!
//! Habit access is scoped by owner: asking for someone else's habit behaves
//! exactly like asking for a missing one. The reminder scheduler reads
//! through [`HabitStore`] and only ever writes `last_reminded_at`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use habitbell_core::error::{HabitBellError, Result};
use habitbell_core::traits::{ChatTargetResolver, HabitStore};
use habitbell_core::validation::{self, Candidate, ValidationErrors};
use habitbell_core::{Habit, HabitId, HabitPatch, NewHabit, TelegramAccount, User, UserId};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const HABIT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    place,
    time,
    action,
    is_pleasant,
    linked_habit_id,
    created_at,
    last_reminded_at,
    periodicity,
    reward,
    execution_time,
    is_public
FROM habits";

const HABIT_ORDER_SQL: &str = "ORDER BY created_at DESC, id ASC";

/// SQLite-backed habit store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        // WAL lets the reminder loop read while the CLI writes
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        Self::init(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                place TEXT NOT NULL,
                time TEXT NOT NULL,              -- HH:MM:SS, local wall clock
                action TEXT NOT NULL,
                is_pleasant INTEGER NOT NULL DEFAULT 0,
                linked_habit_id INTEGER REFERENCES habits(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,        -- YYYY-MM-DD
                last_reminded_at TEXT,           -- YYYY-MM-DD
                periodicity INTEGER NOT NULL DEFAULT 1 CHECK (periodicity BETWEEN 1 AND 7),
                reward TEXT,
                execution_time INTEGER NOT NULL CHECK (execution_time BETWEEN 1 AND 120),
                is_public INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id);
            CREATE INDEX IF NOT EXISTS idx_habits_pleasant ON habits(is_pleasant);

            CREATE TABLE IF NOT EXISTS telegram_accounts (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                chat_id TEXT NOT NULL UNIQUE
            );
            ",
        )
        .map_err(|e| HabitBellError::Database(format!("Migration error: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HabitBellError::Database(format!("Lock: {e}")))
    }

    // ─── Users ──────────────────────────────────────

    pub fn create_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationErrors::single("username", "must not be empty").into());
        }
        let conn = self.lock()?;
        conn.execute("INSERT INTO users (username) VALUES (?1)", [username])
            .map_err(|e| conflict_or_db(e, format!("username '{username}' is taken")))?;
        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
        };
        tracing::info!("👤 User created: {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, username FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    // ─── Telegram accounts ──────────────────────────────────────

    /// Link (or relink) a user's Telegram chat. A chat id belongs to one user only.
    pub fn set_chat_id(&self, user: UserId, chat_id: &str) -> Result<TelegramAccount> {
        let chat_id = chat_id.trim();
        if chat_id.is_empty() {
            return Err(ValidationErrors::single("chat_id", "must not be empty").into());
        }
        let conn = self.lock()?;
        ensure_user(&conn, user)?;
        conn.execute(
            "INSERT INTO telegram_accounts (user_id, chat_id) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET chat_id = excluded.chat_id",
            params![user, chat_id],
        )
        .map_err(|e| conflict_or_db(e, "chat id is linked to another user".into()))?;
        tracing::info!("💬 Chat id saved for user {user}");
        Ok(TelegramAccount {
            user_id: user,
            chat_id: chat_id.to_string(),
        })
    }

    pub fn telegram_account(&self, user: UserId) -> Result<Option<TelegramAccount>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT user_id, chat_id FROM telegram_accounts WHERE user_id = ?1",
            [user],
            |row| {
                Ok(TelegramAccount {
                    user_id: row.get(0)?,
                    chat_id: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    // ─── Habits ──────────────────────────────────────

    /// Create a validated habit owned by `owner`, dated `today`.
    pub fn create_habit(&self, owner: UserId, habit: &NewHabit, today: NaiveDate) -> Result<Habit> {
        let conn = self.lock()?;
        ensure_user(&conn, owner)?;

        let linked = match habit.linked_habit {
            Some(id) => fetch_habit(&conn, id)?,
            None => None,
        };
        validation::validate(&Candidate::from_new(owner, habit), linked.as_ref())?;

        conn.execute(
            "INSERT INTO habits
             (user_id, place, time, action, is_pleasant, linked_habit_id, created_at,
              periodicity, reward, execution_time, is_public)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                owner,
                habit.place,
                habit.time.format(TIME_FORMAT).to_string(),
                habit.action,
                habit.is_pleasant,
                habit.linked_habit,
                today.format(DATE_FORMAT).to_string(),
                habit.periodicity,
                habit.reward.as_deref().filter(|r| !r.trim().is_empty()),
                habit.execution_time,
                habit.is_public,
            ],
        )
        .map_err(db_err)?;

        let id = conn.last_insert_rowid();
        tracing::info!("📅 Habit created: '{}' ({id}) for user {owner}", habit.action);
        fetch_habit(&conn, id)?
            .ok_or_else(|| HabitBellError::Database(format!("habit {id} vanished after insert")))
    }

    /// A habit owned by `owner`.
    pub fn get_habit_for(&self, owner: UserId, id: HabitId) -> Result<Habit> {
        let conn = self.lock()?;
        fetch_owned(&conn, owner, id)
    }

    pub fn list_habits_for(&self, owner: UserId) -> Result<Vec<Habit>> {
        let conn = self.lock()?;
        query_habits(
            &conn,
            &format!("{HABIT_SELECT_SQL} WHERE user_id = ?1 {HABIT_ORDER_SQL}"),
            params![owner],
        )
    }

    /// Habits everyone may see.
    pub fn list_public_habits(&self) -> Result<Vec<Habit>> {
        let conn = self.lock()?;
        query_habits(
            &conn,
            &format!("{HABIT_SELECT_SQL} WHERE is_public = 1 {HABIT_ORDER_SQL}"),
            [],
        )
    }

    /// Apply a partial update to an owned habit. `last_reminded_at`, `created_at`
    /// and the owner are never written here.
    pub fn update_habit(&self, owner: UserId, id: HabitId, patch: &HabitPatch) -> Result<Habit> {
        let conn = self.lock()?;
        let current = fetch_owned(&conn, owner, id)?;
        if patch.is_empty() {
            return Ok(current);
        }

        let merged = patch.apply_to(&current);
        if merged.linked_habit == Some(id) {
            return Err(ValidationErrors::single("linked_habit", "a habit cannot be linked to itself").into());
        }
        let linked = match merged.linked_habit {
            Some(linked_id) => fetch_habit(&conn, linked_id)?,
            None => None,
        };
        validation::validate(&Candidate::from_habit(&merged), linked.as_ref())?;
        if current.is_pleasant && !merged.is_pleasant && is_linked_to(&conn, id)? {
            return Err(ValidationErrors::single(
                "is_pleasant",
                "other habits use this habit as their reward",
            )
            .into());
        }

        conn.execute(
            "UPDATE habits SET
                place = ?2, time = ?3, action = ?4, is_pleasant = ?5, linked_habit_id = ?6,
                periodicity = ?7, reward = ?8, execution_time = ?9, is_public = ?10
             WHERE id = ?1 AND user_id = ?11",
            params![
                id,
                merged.place,
                merged.time.format(TIME_FORMAT).to_string(),
                merged.action,
                merged.is_pleasant,
                merged.linked_habit,
                merged.periodicity,
                merged.reward_text(),
                merged.execution_time,
                merged.is_public,
                owner,
            ],
        )
        .map_err(db_err)?;

        fetch_owned(&conn, owner, id)
    }

    /// Delete an owned habit; habits linking to it lose the link.
    pub fn delete_habit(&self, owner: UserId, id: HabitId) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
                params![id, owner],
            )
            .map_err(db_err)?;
        if deleted == 0 {
            return Err(HabitBellError::NotFound(format!("habit {id}")));
        }
        tracing::info!("🗑️ Habit {id} deleted by user {owner}");
        Ok(())
    }
}

#[async_trait]
impl HabitStore for SqliteStore {
    async fn list_non_pleasant_habits(&self) -> Result<Vec<Habit>> {
        let conn = self.lock()?;
        query_habits(&conn, &format!("{HABIT_SELECT_SQL} WHERE is_pleasant = 0"), [])
    }

    async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>> {
        let conn = self.lock()?;
        fetch_habit(&conn, id)
    }

    async fn update_last_reminded_at(&self, id: HabitId, date: NaiveDate) -> Result<bool> {
        let conn = self.lock()?;
        let date = date.format(DATE_FORMAT).to_string();
        let changed = conn
            .execute(
                "UPDATE habits SET last_reminded_at = ?2
                 WHERE id = ?1 AND (last_reminded_at IS NULL OR last_reminded_at <> ?2)",
                params![id, date],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    async fn revert_last_reminded_at(
        &self,
        id: HabitId,
        date: NaiveDate,
        previous: Option<NaiveDate>,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE habits SET last_reminded_at = ?3 WHERE id = ?1 AND last_reminded_at = ?2",
            params![
                id,
                date.format(DATE_FORMAT).to_string(),
                previous.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl ChatTargetResolver for SqliteStore {
    async fn chat_id_for(&self, user: UserId) -> Result<Option<String>> {
        Ok(self.telegram_account(user)?.map(|account| account.chat_id))
    }
}

fn ensure_user(conn: &Connection, user: UserId) -> Result<()> {
    let exists: bool = conn
        .query_row("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)", [user], |row| row.get(0))
        .map_err(db_err)?;
    if exists {
        Ok(())
    } else {
        Err(HabitBellError::NotFound(format!("user {user}")))
    }
}

fn is_linked_to(conn: &Connection, id: HabitId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM habits WHERE linked_habit_id = ?1)",
        [id],
        |row| row.get(0),
    )
    .map_err(db_err)
}

fn fetch_habit(conn: &Connection, id: HabitId) -> Result<Option<Habit>> {
    conn.query_row(&format!("{HABIT_SELECT_SQL} WHERE id = ?1"), [id], row_to_habit)
        .optional()
        .map_err(db_err)
}

fn fetch_owned(conn: &Connection, owner: UserId, id: HabitId) -> Result<Habit> {
    fetch_habit(conn, id)?
        .filter(|h| h.owner == owner)
        .ok_or_else(|| HabitBellError::NotFound(format!("habit {id}")))
}

fn query_habits<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Habit>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt.query_map(params, row_to_habit).map_err(db_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
}

fn row_to_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let time: String = row.get(3)?;
    let created_at: String = row.get(7)?;
    let last_reminded_at: Option<String> = row.get(8)?;

    Ok(Habit {
        id: row.get(0)?,
        owner: row.get(1)?,
        place: row.get(2)?,
        time: NaiveTime::parse_from_str(&time, TIME_FORMAT).map_err(|e| conversion_err(3, e))?,
        action: row.get(4)?,
        is_pleasant: row.get(5)?,
        linked_habit: row.get(6)?,
        created_at: NaiveDate::parse_from_str(&created_at, DATE_FORMAT)
            .map_err(|e| conversion_err(7, e))?,
        last_reminded_at: last_reminded_at
            .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
            .transpose()
            .map_err(|e| conversion_err(8, e))?,
        periodicity: row.get(9)?,
        reward: row.get(10)?,
        execution_time: row.get(11)?,
        is_public: row.get(12)?,
    })
}

fn conversion_err(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn db_err(e: rusqlite::Error) -> HabitBellError {
    HabitBellError::Database(e.to_string())
}

fn conflict_or_db(e: rusqlite::Error, message: String) -> HabitBellError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            HabitBellError::Conflict(message)
        }
        _ => db_err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 10).unwrap()
    }

    fn new_habit(action: &str) -> NewHabit {
        NewHabit {
            place: "home".into(),
            time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            action: action.into(),
            is_pleasant: false,
            linked_habit: None,
            periodicity: 1,
            reward: Some("coffee".into()),
            execution_time: 60,
            is_public: false,
        }
    }

    fn pleasant(action: &str) -> NewHabit {
        NewHabit {
            is_pleasant: true,
            reward: None,
            ..new_habit(action)
        }
    }

    fn store_with_users() -> (SqliteStore, User, User) {
        let store = SqliteStore::open_in_memory().unwrap();
        let alice = store.create_user("alice").unwrap();
        let bob = store.create_user("bob").unwrap();
        (store, alice, bob)
    }

    #[test]
    fn test_create_and_get_habit() {
        let (store, alice, _) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("stretch"), today()).unwrap();
        assert_eq!(habit.owner, alice.id);
        assert_eq!(habit.created_at, today());
        assert_eq!(habit.last_reminded_at, None);
        assert_eq!(habit.time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());

        let fetched = store.get_habit_for(alice.id, habit.id).unwrap();
        assert_eq!(fetched, habit);
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let (store, _, _) = store_with_users();
        assert!(matches!(store.create_user("alice"), Err(HabitBellError::Conflict(_))));
        assert!(matches!(store.create_user("  "), Err(HabitBellError::Validation(_))));
    }

    #[test]
    fn test_create_rejects_invalid_habit() {
        let (store, alice, _) = store_with_users();
        let mut bad = new_habit("stretch");
        bad.execution_time = 121;
        let err = store.create_habit(alice.id, &bad, today()).unwrap_err();
        match err {
            HabitBellError::Validation(errors) => assert!(errors.get("execution_time").is_some()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.list_habits_for(alice.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_for_unknown_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.create_habit(42, &new_habit("x"), today()),
            Err(HabitBellError::NotFound(_))
        ));
    }

    #[test]
    fn test_link_only_own_pleasant_habit() {
        let (store, alice, bob) = store_with_users();
        let bobs_reward = store.create_habit(bob.id, &pleasant("bob's show"), today()).unwrap();
        let alices_reward = store.create_habit(alice.id, &pleasant("guitar"), today()).unwrap();

        let mut linked = new_habit("run");
        linked.reward = None;
        linked.linked_habit = Some(bobs_reward.id);
        assert!(matches!(
            store.create_habit(alice.id, &linked, today()),
            Err(HabitBellError::Validation(_))
        ));

        linked.linked_habit = Some(alices_reward.id);
        let habit = store.create_habit(alice.id, &linked, today()).unwrap();
        assert_eq!(habit.linked_habit, Some(alices_reward.id));
    }

    #[test]
    fn test_owner_scoping() {
        let (store, alice, bob) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();

        assert!(matches!(store.get_habit_for(bob.id, habit.id), Err(HabitBellError::NotFound(_))));
        assert!(store.list_habits_for(bob.id).unwrap().is_empty());
        assert!(matches!(
            store.update_habit(bob.id, habit.id, &HabitPatch { action: Some("x".into()), ..Default::default() }),
            Err(HabitBellError::NotFound(_))
        ));
        assert!(matches!(store.delete_habit(bob.id, habit.id), Err(HabitBellError::NotFound(_))));
        assert_eq!(store.list_habits_for(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn test_public_listing() {
        let (store, alice, bob) = store_with_users();
        let mut public = new_habit("drink water");
        public.is_public = true;
        store.create_habit(alice.id, &public, today()).unwrap();
        store.create_habit(bob.id, &new_habit("private"), today()).unwrap();

        let listed = store.list_public_habits().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].action, "drink water");
    }

    #[test]
    fn test_listing_order_newest_first() {
        let (store, alice, _) = store_with_users();
        let older = store
            .create_habit(alice.id, &new_habit("a"), today() - chrono::Duration::days(1))
            .unwrap();
        let first = store.create_habit(alice.id, &new_habit("b"), today()).unwrap();
        let second = store.create_habit(alice.id, &new_habit("c"), today()).unwrap();

        let ids: Vec<HabitId> = store.list_habits_for(alice.id).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![first.id, second.id, older.id]);
    }

    #[tokio::test]
    async fn test_update_keeps_last_reminded_at() {
        let (store, alice, _) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();
        assert!(store.update_last_reminded_at(habit.id, today()).await.unwrap());

        let patch = HabitPatch {
            place: Some("library".into()),
            periodicity: Some(2),
            ..Default::default()
        };
        let updated = store.update_habit(alice.id, habit.id, &patch).unwrap();
        assert_eq!(updated.place, "library");
        assert_eq!(updated.periodicity, 2);
        assert_eq!(updated.last_reminded_at, Some(today()));
        assert_eq!(updated.created_at, today());
    }

    #[test]
    fn test_update_is_validated_against_merged_state() {
        let (store, alice, _) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();

        // becoming pleasant while a reward is set is rejected
        let patch = HabitPatch {
            is_pleasant: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            store.update_habit(alice.id, habit.id, &patch),
            Err(HabitBellError::Validation(_))
        ));

        let patch = HabitPatch {
            linked_habit: Some(Some(habit.id)),
            reward: Some(None),
            ..Default::default()
        };
        assert!(matches!(
            store.update_habit(alice.id, habit.id, &patch),
            Err(HabitBellError::Validation(_))
        ));
        assert_eq!(store.get_habit_for(alice.id, habit.id).unwrap(), habit);
    }

    #[test]
    fn test_delete_clears_links() {
        let (store, alice, _) = store_with_users();
        let reward = store.create_habit(alice.id, &pleasant("nap"), today()).unwrap();
        let mut linked = new_habit("walk");
        linked.reward = None;
        linked.linked_habit = Some(reward.id);
        let habit = store.create_habit(alice.id, &linked, today()).unwrap();

        store.delete_habit(alice.id, reward.id).unwrap();
        assert_eq!(store.get_habit_for(alice.id, habit.id).unwrap().linked_habit, None);
    }

    #[test]
    fn test_chat_id_upsert_and_uniqueness() {
        let (store, alice, bob) = store_with_users();
        store.set_chat_id(alice.id, "111").unwrap();
        let account = store.set_chat_id(alice.id, " 222 ").unwrap();
        assert_eq!(account.chat_id, "222");
        assert_eq!(store.telegram_account(alice.id).unwrap(), Some(account));

        assert!(matches!(store.set_chat_id(bob.id, "222"), Err(HabitBellError::Conflict(_))));
        assert!(matches!(store.set_chat_id(99, "333"), Err(HabitBellError::NotFound(_))));
        assert!(matches!(store.set_chat_id(bob.id, " "), Err(HabitBellError::Validation(_))));
        assert_eq!(store.telegram_account(bob.id).unwrap(), None);
    }

    #[tokio::test]
    async fn test_scheduler_view() {
        let (store, alice, _) = store_with_users();
        store.set_chat_id(alice.id, "777").unwrap();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();
        store.create_habit(alice.id, &pleasant("nap"), today()).unwrap();

        let candidates = store.list_non_pleasant_habits().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, habit.id);

        assert_eq!(store.chat_id_for(alice.id).await.unwrap().as_deref(), Some("777"));
        assert_eq!(store.get_habit(habit.id).await.unwrap().unwrap().action, "read");
        assert_eq!(store.get_habit(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_conditional_reminder_update() {
        let (store, alice, _) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();

        assert!(store.update_last_reminded_at(habit.id, today()).await.unwrap());
        assert!(!store.update_last_reminded_at(habit.id, today()).await.unwrap());
        let tomorrow = today().succ_opt().unwrap();
        assert!(store.update_last_reminded_at(habit.id, tomorrow).await.unwrap());
        assert_eq!(store.get_habit(habit.id).await.unwrap().unwrap().last_reminded_at, Some(tomorrow));
    }

    #[tokio::test]
    async fn test_revert_restores_previous_date() {
        let (store, alice, _) = store_with_users();
        let habit = store.create_habit(alice.id, &new_habit("read"), today()).unwrap();
        let yesterday = today().pred_opt().unwrap();
        assert!(store.update_last_reminded_at(habit.id, yesterday).await.unwrap());

        assert!(store.update_last_reminded_at(habit.id, today()).await.unwrap());
        store.revert_last_reminded_at(habit.id, today(), Some(yesterday)).await.unwrap();
        assert_eq!(store.get_habit(habit.id).await.unwrap().unwrap().last_reminded_at, Some(yesterday));

        // a stale revert does not clobber a newer claim
        assert!(store.update_last_reminded_at(habit.id, today()).await.unwrap());
        store.revert_last_reminded_at(habit.id, yesterday, None).await.unwrap();
        assert_eq!(store.get_habit(habit.id).await.unwrap().unwrap().last_reminded_at, Some(today()));

        store.revert_last_reminded_at(habit.id, today(), None).await.unwrap();
        assert_eq!(store.get_habit(habit.id).await.unwrap().unwrap().last_reminded_at, None);
    }

    #[test]
    fn test_linked_reward_cannot_become_unpleasant() {
        let (store, alice, _) = store_with_users();
        let nap = store.create_habit(alice.id, &pleasant("nap"), today()).unwrap();
        let mut linked = new_habit("walk");
        linked.reward = None;
        linked.linked_habit = Some(nap.id);
        store.create_habit(alice.id, &linked, today()).unwrap();

        let patch = HabitPatch {
            is_pleasant: Some(false),
            reward: Some(Some("cake".into())),
            ..Default::default()
        };
        match store.update_habit(alice.id, nap.id, &patch) {
            Err(HabitBellError::Validation(errors)) => assert!(errors.get("is_pleasant").is_some()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(store.get_habit_for(alice.id, nap.id).unwrap().is_pleasant);

        let lonely = store.create_habit(alice.id, &pleasant("bath"), today()).unwrap();
        let updated = store.update_habit(alice.id, lonely.id, &patch).unwrap();
        assert!(!updated.is_pleasant);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("habits.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_user("carol").unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get_user(1).unwrap().unwrap().username, "carol");
    }
}
