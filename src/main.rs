//! Binary entrypoint for the HabitForge CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `task add|list|edit|remove` - manage tasks
//! - `complete <task-id>` - complete a task and collect rewards
//! - `status` - print the user's progression summary
//! - `quest list|start|check|abandon` - quest lifecycle
//! - `challenge list|start|check` - time-boxed challenge lifecycle
//! - `shop list|buy` - browse and unlock customization items
//! - `leaderboard [--metric <m>]` - ranked stats across all users
//!
//! See the library crate docs for module-level details: `habitforge::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;

use habitforge::config::Config;
use habitforge::engine::{
    self, CheckOutcome, Frequency, InstanceState, Metric, Store, TaskRecord, TemplateCatalog,
};
use habitforge::logutil::escape_log;

#[derive(Parser)]
#[command(name = "habitforge")]
#[command(about = "A gamified habit and task tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// User to act as
    #[arg(short, long, default_value = "default", global = true)]
    user: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init,
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Complete a task and collect rewards
    Complete {
        /// Task id
        id: String,
    },
    /// Show the user's progression summary
    Status,
    /// Quest lifecycle
    Quest {
        #[command(subcommand)]
        action: QuestAction,
    },
    /// Time-boxed challenge lifecycle
    Challenge {
        #[command(subcommand)]
        action: ChallengeAction,
    },
    /// Browse and unlock customization items
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Ranked stats across all users
    Leaderboard {
        /// Metric: level, xp, coins, streak, tasks
        #[arg(short, long, default_value = "level")]
        metric: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Create a task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Mark as recurring with the given frequency: daily, weekly, custom
        #[arg(short, long)]
        recurring: Option<String>,
        /// Scheduled time of day, "HH:MM"
        #[arg(short, long)]
        time: Option<String>,
        /// XP reward (fixed at creation)
        #[arg(long, default_value_t = 10)]
        xp: u32,
        /// Coin reward (fixed at creation)
        #[arg(long, default_value_t = 5)]
        coins: i64,
    },
    /// List the user's tasks
    List,
    /// Edit task metadata (rewards stay fixed)
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        recurring: Option<String>,
        #[arg(short = 'T', long)]
        time: Option<String>,
    },
    /// Delete a task
    Remove { id: String },
}

#[derive(Subcommand)]
enum QuestAction {
    /// List templates and the user's instances
    List,
    /// Start a quest from a template
    Start { template: String },
    /// Re-evaluate a quest's objective
    Check { id: String },
    /// Abandon an active quest
    Abandon { id: String },
}

#[derive(Subcommand)]
enum ChallengeAction {
    /// List templates and the user's instances (expiring overdue ones)
    List,
    /// Start a challenge from a template
    Start { template: String },
    /// Re-evaluate a challenge's objective
    Check { id: String },
}

#[derive(Subcommand)]
enum ShopAction {
    /// List catalog items
    List,
    /// Unlock an item
    Buy { item: String },
}

fn parse_frequency(s: &str) -> Result<Frequency> {
    match s {
        "daily" => Ok(Frequency::Daily),
        "weekly" => Ok(Frequency::Weekly),
        "custom" => Ok(Frequency::Custom),
        other => Err(anyhow!("unknown frequency: {}", other)),
    }
}

fn parse_metric(s: &str) -> Result<Metric> {
    match s {
        "level" => Ok(Metric::Level),
        "xp" => Ok(Metric::Xp),
        "coins" => Ok(Metric::Coins),
        "streak" => Ok(Metric::Streak),
        "tasks" => Ok(Metric::TasksCompleted),
        other => Err(anyhow!("unknown metric: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        Config::create_default(&cli.config).await?;
        println!("Wrote default configuration to {}", cli.config);
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config).await?;
    init_logging(&config, cli.verbose);

    let store = Store::open(&config.storage.data_dir)?;
    let catalog = TemplateCatalog::load_or_builtin(&config.tracker.seed_dir)?;
    let user_id = cli.user.as_str();

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Task { action } => run_task(&store, user_id, action)?,
        Commands::Complete { id } => {
            let outcome = engine::complete_task(&store, user_id, &id, engine::today())?;
            println!(
                "Task completed! +{} xp, +{} coins",
                outcome.xp_awarded, outcome.coins_awarded
            );
            if outcome.level_up {
                let user = store.get_user(user_id)?;
                println!("Level up! You are now level {}", user.level);
            }
            for badge in &outcome.new_badges {
                println!("Badge unlocked: {}", badge);
            }
        }
        Commands::Status => {
            let user = store.ensure_user(user_id)?;
            let needed = user.xp_needed();
            let pct = (user.xp as f64 / needed as f64) * 100.0;
            println!("{} — level {}", user.display_name, user.level);
            println!("  xp: {}/{} ({:.0}%)", user.xp, needed, pct);
            println!("  coins: {} (lifetime {})", user.coins, user.total_coins_earned);
            println!("  streak: {} day(s)", user.streak);
            println!("  tasks completed: {}", user.total_tasks_completed);
            if !user.badges.is_empty() {
                println!("  badges: {}", user.badges.join(", "));
            }
            println!("  inventory: {}", user.inventory.join(", "));
        }
        Commands::Quest { action } => run_quest(&store, &catalog, user_id, action)?,
        Commands::Challenge { action } => run_challenge(&store, &catalog, user_id, action)?,
        Commands::Shop { action } => run_shop(&store, &catalog, user_id, action)?,
        Commands::Leaderboard { metric } => {
            let metric = parse_metric(&metric)?;
            let users = store.list_users()?;
            for entry in engine::rank(&users, metric) {
                println!("{:>3}. {} — {}", entry.rank, entry.display_name, entry.value);
            }
        }
    }

    Ok(())
}

fn run_task(store: &Store, user_id: &str, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add {
            title,
            description,
            recurring,
            time,
            xp,
            coins,
        } => {
            let mut task = TaskRecord::new(user_id, &title)
                .with_description(&description)
                .with_rewards(xp, coins);
            if let Some(freq) = recurring {
                task = task.with_recurring(parse_frequency(&freq)?);
            }
            if let Some(t) = time {
                task = task.with_scheduled_time(&t);
            }
            info!("{} created task '{}'", user_id, escape_log(&title));
            let task_id = task.id.clone();
            store.put_task(task)?;
            println!("Created task {}", task_id);
        }
        TaskAction::List => {
            let tasks = store.list_tasks(user_id)?;
            if tasks.is_empty() {
                println!("No tasks yet.");
            }
            for task in tasks {
                let done = if task.completed_on(engine::today()) {
                    "x"
                } else {
                    " "
                };
                println!(
                    "[{}] {}  {} (+{} xp, +{} coins, streak {})",
                    done, task.id, task.title, task.xp_reward, task.coin_reward, task.streak
                );
            }
        }
        TaskAction::Edit {
            id,
            title,
            description,
            recurring,
            time,
        } => {
            let mut task = store.get_task(user_id, &id)?;
            if let Some(t) = title {
                task.title = t;
            }
            if let Some(d) = description {
                task.description = d;
            }
            if let Some(freq) = recurring {
                task.recurring = true;
                task.frequency = parse_frequency(&freq)?;
            }
            if let Some(t) = time {
                task.scheduled_time = Some(t);
            }
            store.put_task(task)?;
            println!("Updated task {}", id);
        }
        TaskAction::Remove { id } => {
            store.delete_task(user_id, &id)?;
            println!("Deleted task {}", id);
        }
    }
    Ok(())
}

fn describe_state(state: &InstanceState) -> &'static str {
    match state {
        InstanceState::Active { .. } => "active",
        InstanceState::Completed { .. } => "completed",
        InstanceState::Expired { .. } => "expired",
    }
}

fn print_check_outcome(outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::InProgress { progress, required } => {
            println!("Progress: {}/{}", progress, required);
        }
        CheckOutcome::Completed {
            xp_awarded,
            coins_awarded,
            level_up,
        } => {
            println!("Completed! +{} xp, +{} coins", xp_awarded, coins_awarded);
            if *level_up {
                println!("Level up!");
            }
        }
        CheckOutcome::Expired => {
            println!("Expired: the deadline passed before the objective was met.");
        }
    }
}

fn run_quest(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    action: QuestAction,
) -> Result<()> {
    match action {
        QuestAction::List => {
            println!("=== Quest templates ===");
            for template in catalog.quests.values() {
                println!(
                    "{} — {} (+{} xp, +{} coins)",
                    template.id, template.name, template.xp_reward, template.coin_reward
                );
            }
            println!("=== Your quests ===");
            for quest in store.list_quests(user_id)? {
                println!(
                    "{}  {} [{}] progress {}",
                    quest.id,
                    quest.template_id,
                    describe_state(&quest.state),
                    quest.progress
                );
            }
        }
        QuestAction::Start { template } => {
            let instance =
                engine::start_quest(store, catalog, user_id, &template, chrono::Utc::now())?;
            println!("Started quest {} ({})", template, instance.id);
        }
        QuestAction::Check { id } => {
            let outcome = engine::check_quest(store, catalog, user_id, &id, chrono::Utc::now())?;
            print_check_outcome(&outcome);
        }
        QuestAction::Abandon { id } => {
            engine::abandon_quest(store, user_id, &id)?;
            println!("Abandoned quest {}", id);
        }
    }
    Ok(())
}

fn run_challenge(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    action: ChallengeAction,
) -> Result<()> {
    match action {
        ChallengeAction::List => {
            println!("=== Challenge templates ===");
            for template in catalog.challenges.values() {
                println!(
                    "{} — {} ({}h, +{} xp, +{} coins)",
                    template.id,
                    template.name,
                    template.duration_hours,
                    template.xp_reward,
                    template.coin_reward
                );
            }
            println!("=== Your challenges ===");
            for challenge in engine::sweep_challenges(store, user_id, chrono::Utc::now())? {
                println!(
                    "{}  {} [{}] progress {}",
                    challenge.id,
                    challenge.template_id,
                    describe_state(&challenge.state),
                    challenge.progress
                );
            }
        }
        ChallengeAction::Start { template } => {
            let instance =
                engine::start_challenge(store, catalog, user_id, &template, chrono::Utc::now())?;
            println!(
                "Started challenge {} ({}), deadline {}",
                template,
                instance.id,
                instance.deadline().format("%Y-%m-%d %H:%M UTC")
            );
        }
        ChallengeAction::Check { id } => {
            let outcome =
                engine::check_challenge(store, catalog, user_id, &id, chrono::Utc::now())?;
            print_check_outcome(&outcome);
        }
    }
    Ok(())
}

fn run_shop(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    action: ShopAction,
) -> Result<()> {
    match action {
        ShopAction::List => {
            let user = store.ensure_user(user_id)?;
            for item in catalog.shop_items.values() {
                let owned = if user.owns_item(&item.id) { " (owned)" } else { "" };
                println!("{} — {} ({} coins){}", item.id, item.name, item.cost, owned);
            }
        }
        ShopAction::Buy { item } => {
            let user = engine::purchase_item(store, catalog, user_id, &item)?;
            println!("Unlocked {}! {} coins remaining", item, user.coins);
        }
    }
    Ok(())
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    if let Some(ref file) = config.logging.file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // If stdout is not a terminal, skip console output to avoid
            // polluting piped command output.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }

    let _ = builder.try_init();
}
