//! # HabitBell — habit tracker with Telegram reminders
//!
//! Usage:
//!   habitbell init                            # Write a default ~/.habitbell/config.toml
//!   habitbell run-once                        # Send reminders due right now, print `sent=N`
//!   habitbell run-once --at 2026-05-01T08:00:00+03:00
//!   habitbell serve                           # Check every minute until Ctrl-C
//!   habitbell user add alice
//!   habitbell chat-id set --user 1 123456789
//!   habitbell user show 1
//!   habitbell habit add --user 1 --action "drink water" --place kitchen --time 08:00 --reward tea --execution-time 30
//!   habitbell habit list --user 1

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveTime};
use clap::{Args, Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use habitbell_channels::TelegramNotifier;
use habitbell_core::traits::{Clock, FixedClock, SystemClock};
use habitbell_core::{Habit, HabitBellConfig, HabitId, HabitPatch, NewHabit, UserId};
use habitbell_db::SqliteStore;
use habitbell_scheduler::{ReminderSelector, spawn_reminder_loop};

#[derive(Parser)]
#[command(
    name = "habitbell",
    version,
    about = "🔔 HabitBell — habit tracker with Telegram reminders"
)]
struct Cli {
    /// Config file (default: ~/.habitbell/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Send the reminders that are due right now, then exit
    RunOnce {
        /// Evaluate at this instant (RFC 3339) instead of the current time
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<FixedOffset>>,
    },
    /// Check for due reminders every minute until interrupted
    Serve,
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Link a Telegram chat to a user
    ChatId {
        #[command(subcommand)]
        command: ChatIdCommand,
    },
    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommand,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add { username: String },
    /// Show a user and the linked Telegram chat
    Show { id: UserId },
}

#[derive(Subcommand)]
enum ChatIdCommand {
    /// Set (or replace) the user's Telegram chat id
    Set {
        #[arg(long)]
        user: UserId,
        chat_id: String,
    },
}

#[derive(Subcommand)]
enum HabitCommand {
    /// Create a habit
    Add(AddHabitArgs),
    /// Change fields of one of your habits
    Update(UpdateHabitArgs),
    /// List your habits
    List {
        #[arg(long)]
        user: UserId,
    },
    /// List public habits of all users
    Public,
    /// Delete one of your habits
    Delete {
        #[arg(long)]
        user: UserId,
        id: HabitId,
    },
}

#[derive(Args)]
struct AddHabitArgs {
    #[arg(long)]
    user: UserId,
    #[arg(long)]
    action: String,
    #[arg(long)]
    place: String,
    /// Local time, HH:MM
    #[arg(long, value_parser = parse_time)]
    time: NaiveTime,
    /// Mark as pleasant (a reward habit, never reminded about)
    #[arg(long)]
    pleasant: bool,
    /// Repeat every N days (1-7)
    #[arg(long, default_value = "1")]
    periodicity: u8,
    #[arg(long, conflicts_with = "linked")]
    reward: Option<String>,
    /// Id of a pleasant habit to do afterwards
    #[arg(long)]
    linked: Option<HabitId>,
    /// Seconds needed (1-120)
    #[arg(long)]
    execution_time: u16,
    #[arg(long)]
    public: bool,
}

#[derive(Args)]
struct UpdateHabitArgs {
    #[arg(long)]
    user: UserId,
    id: HabitId,
    #[arg(long)]
    action: Option<String>,
    #[arg(long)]
    place: Option<String>,
    #[arg(long, value_parser = parse_time)]
    time: Option<NaiveTime>,
    #[arg(long)]
    pleasant: Option<bool>,
    #[arg(long)]
    periodicity: Option<u8>,
    #[arg(long, conflicts_with = "clear_reward")]
    reward: Option<String>,
    #[arg(long)]
    clear_reward: bool,
    #[arg(long, conflicts_with = "unlink")]
    linked: Option<HabitId>,
    #[arg(long)]
    unlink: bool,
    #[arg(long)]
    execution_time: Option<u16>,
    #[arg(long)]
    public: Option<bool>,
}

impl UpdateHabitArgs {
    fn to_patch(&self) -> HabitPatch {
        HabitPatch {
            place: self.place.clone(),
            time: self.time,
            action: self.action.clone(),
            is_pleasant: self.pleasant,
            linked_habit: if self.unlink { Some(None) } else { self.linked.map(Some) },
            periodicity: self.periodicity,
            reward: if self.clear_reward { Some(None) } else { self.reward.clone().map(Some) },
            execution_time: self.execution_time,
            is_public: self.public,
        }
    }
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("expected HH:MM ({e})"))
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected RFC 3339 timestamp ({e})"))
}

fn load_config(path: Option<&str>) -> Result<HabitBellConfig> {
    let config = match path {
        Some(p) => {
            let expanded = expand_path(p);
            let mut config = HabitBellConfig::load_from(Path::new(&expanded))?;
            config.apply_env();
            config
        }
        None => HabitBellConfig::load()?,
    };
    Ok(config)
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn print_habit(habit: &Habit) {
    let extra = if habit.is_pleasant {
        "pleasant".to_string()
    } else if let Some(reward) = habit.reward_text() {
        format!("reward: {reward}")
    } else if let Some(linked) = habit.linked_habit {
        format!("then habit #{linked}")
    } else {
        String::new()
    };
    println!(
        "#{:<4} {} every {}d  {} @ {}  ({}s{}{})",
        habit.id,
        habit.time.format("%H:%M"),
        habit.periodicity,
        habit.action,
        habit.place,
        habit.execution_time,
        if extra.is_empty() { "" } else { ", " },
        extra
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "habitbell=debug,habitbell_scheduler=debug,habitbell_channels=debug,habitbell_db=debug,habitbell_core=debug"
    } else {
        "habitbell=info,habitbell_scheduler=info,habitbell_channels=info,habitbell_db=info,habitbell_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    if let Command::Init { force } = cli.command {
        let path: std::path::PathBuf = match cli.config.as_deref() {
            Some(p) => expand_path(p).into(),
            None => HabitBellConfig::default_path(),
        };
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        HabitBellConfig::default().save_to(&path)?;
        println!("✅ Config written to {}", path.display());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let offset = config.utc_offset()?;
    let clock = SystemClock::new(offset);

    let db_path = config.database_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?,
    );

    match cli.command {
        Command::Init { .. } => {}
        Command::RunOnce { at } => {
            let clock: Box<dyn Clock> = match at {
                Some(at) => Box::new(FixedClock(at.with_timezone(&offset))),
                None => Box::new(clock),
            };
            let selector = build_selector(&config, store);
            let sent = selector.run_once(clock.now()).await?;
            println!("sent={sent}");
        }
        Command::Serve => {
            let selector = Arc::new(build_selector(&config, store));
            println!("🔔 HabitBell v{}", env!("CARGO_PKG_VERSION"));
            println!("   🗄️  Database:  {}", db_path.display());
            println!("   🕒 Timezone:  UTC{}", offset);
            println!("   ⏱️  Interval:  {}s", config.scheduler.check_interval_secs);
            println!();

            let reminder_loop = tokio::spawn(spawn_reminder_loop(
                selector,
                Arc::new(clock),
                config.scheduler.check_interval_secs,
            ));
            tokio::signal::ctrl_c().await?;
            tracing::info!("👋 Shutting down");
            reminder_loop.abort();
        }
        Command::User { command } => match command {
            UserCommand::Add { username } => {
                let user = store.create_user(&username)?;
                println!("✅ User #{} '{}' created", user.id, user.username);
            }
            UserCommand::Show { id } => {
                let user = store
                    .get_user(id)?
                    .with_context(|| format!("user {id} not found"))?;
                println!("👤 User #{} '{}'", user.id, user.username);
                match store.telegram_account(id)? {
                    Some(account) => println!("   💬 Telegram chat: {}", account.chat_id),
                    None => println!("   💬 Telegram chat: not linked (no reminders)"),
                }
            }
        },
        Command::ChatId { command } => match command {
            ChatIdCommand::Set { user, chat_id } => {
                let account = store.set_chat_id(user, &chat_id)?;
                println!("✅ Chat {} linked to user #{}", account.chat_id, account.user_id);
            }
        },
        Command::Habit { command } => match command {
            HabitCommand::Add(args) => {
                let new = NewHabit {
                    place: args.place,
                    time: args.time,
                    action: args.action,
                    is_pleasant: args.pleasant,
                    linked_habit: args.linked,
                    periodicity: args.periodicity,
                    reward: args.reward,
                    execution_time: args.execution_time,
                    is_public: args.public,
                };
                let habit = store.create_habit(args.user, &new, clock.now().date_naive())?;
                print_habit(&habit);
            }
            HabitCommand::Update(args) => {
                let habit = store.update_habit(args.user, args.id, &args.to_patch())?;
                print_habit(&habit);
            }
            HabitCommand::List { user } => {
                let habits = store.list_habits_for(user)?;
                if habits.is_empty() {
                    println!("No habits yet.");
                }
                habits.iter().for_each(print_habit);
            }
            HabitCommand::Public => {
                store.list_public_habits()?.iter().for_each(print_habit);
            }
            HabitCommand::Delete { user, id } => {
                store.delete_habit(user, id)?;
                println!("🗑️ Habit #{id} deleted");
            }
        },
    }

    Ok(())
}

fn build_selector(config: &HabitBellConfig, store: Arc<SqliteStore>) -> ReminderSelector {
    let notifier = Arc::new(TelegramNotifier::new(config.telegram.clone()));
    ReminderSelector::new(store.clone(), store, notifier).configure(&config.scheduler)
}
