use anyhow::Result;
use chrono::NaiveDate;
use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use hourpot::AppCommand;
use hourpot::cli::activity::{ActivityEdit, BulkEdit};
use hourpot::cli::habits::HabitEdit;
use hourpot::core::log::init_logging;
use hourpot::core::models::{Currency, SettingsUpdate};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Sign in to the hosted backend
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Create a new account instead of signing in
        #[arg(long)]
        sign_up: bool,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed in user
    Whoami,
    /// Display value, goal progress and projections
    Dashboard {
        /// Compute projections as of this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Try a different goal date without saving it (YYYY-MM-DD)
        #[arg(long)]
        goal_date: Option<NaiveDate>,
    },
    /// Log time spent on a habit
    Log {
        #[arg(long)]
        hours: Decimal,
        /// Habit name, case-insensitive
        #[arg(long)]
        category: String,
        #[arg(long)]
        note: Option<String>,
        /// Defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List, edit and delete logged activities
    #[command(subcommand)]
    Activity(ActivityCommands),
    /// Manage habits and their hourly rates
    #[command(subcommand)]
    Habit(HabitCommands),
    /// Savings goal, currency and goal date
    #[command(subcommand)]
    Settings(SettingsCommands),
    /// Suggested hourly rates for common habits
    Guide {
        #[arg(long)]
        currency: Option<Currency>,
        /// Also show the yearly value of this many hours a week
        #[arg(long)]
        hours_per_week: Option<Decimal>,
    },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// Show the most recent activities
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Change an activity; its value is recomputed from the habit's current rate
    Edit {
        id: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        hours: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete an activity
    Delete { id: i64 },
    /// Apply one change to several activities
    #[command(group(
        ArgGroup::new("action")
            .required(true)
            .args(["adjust_hours", "category", "append_note", "delete"])
    ))]
    Bulk {
        /// Comma separated activity ids
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        /// Add (or with a minus sign, remove) hours
        #[arg(long, allow_negative_numbers = true)]
        adjust_hours: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        append_note: Option<String>,
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Show all habits
    List,
    /// Add a habit; negative rates mark time that destroys value
    Add {
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        rate: Decimal,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename or re-rate a habit; logged activities keep their value
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        rate: Option<Decimal>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a habit that no activity uses
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        goal: Option<Decimal>,
        #[arg(long)]
        currency: Option<Currency>,
        /// YYYY-MM-DD
        #[arg(long)]
        goal_date: Option<NaiveDate>,
    },
}

impl TryFrom<Commands> for AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<AppCommand> {
        Ok(match cmd {
            Commands::Setup => anyhow::bail!("Setup command should be handled separately"),
            Commands::Login {
                email,
                password,
                sign_up,
            } => AppCommand::Login {
                email,
                password,
                sign_up,
            },
            Commands::Logout => AppCommand::Logout,
            Commands::Whoami => AppCommand::WhoAmI,
            Commands::Dashboard { today, goal_date } => {
                AppCommand::Dashboard { today, goal_date }
            }
            Commands::Log {
                hours,
                category,
                note,
                date,
            } => AppCommand::Log {
                hours,
                category,
                note,
                date,
            },
            Commands::Activity(activity) => match activity {
                ActivityCommands::List { limit } => AppCommand::ActivityList { limit },
                ActivityCommands::Edit {
                    id,
                    date,
                    hours,
                    category,
                    note,
                } => AppCommand::ActivityEdit {
                    id,
                    changes: ActivityEdit {
                        date,
                        hours,
                        category,
                        note,
                    },
                },
                ActivityCommands::Delete { id } => AppCommand::ActivityDelete { id },
                ActivityCommands::Bulk {
                    ids,
                    adjust_hours,
                    category,
                    append_note,
                    delete,
                } => {
                    let edit = match (adjust_hours, category, append_note) {
                        (Some(delta), _, _) => BulkEdit::AdjustHours(delta),
                        (_, Some(name), _) => BulkEdit::Category(name),
                        (_, _, Some(text)) => BulkEdit::AppendNote(text),
                        _ if delete => BulkEdit::Delete,
                        _ => anyhow::bail!("Choose one bulk action"),
                    };
                    AppCommand::ActivityBulk { ids, edit }
                }
            },
            Commands::Habit(habit) => match habit {
                HabitCommands::List => AppCommand::HabitList,
                HabitCommands::Add {
                    name,
                    rate,
                    description,
                } => AppCommand::HabitAdd {
                    name,
                    rate,
                    description,
                },
                HabitCommands::Update {
                    id,
                    name,
                    rate,
                    description,
                } => AppCommand::HabitUpdate {
                    id,
                    changes: HabitEdit {
                        name,
                        rate,
                        description,
                    },
                },
                HabitCommands::Delete { id } => AppCommand::HabitDelete { id },
            },
            Commands::Settings(settings) => match settings {
                SettingsCommands::Show => AppCommand::SettingsShow,
                SettingsCommands::Set {
                    goal,
                    currency,
                    goal_date,
                } => AppCommand::SettingsSet(SettingsUpdate {
                    savings_goal: goal,
                    currency,
                    goal_date,
                }),
            },
            Commands::Guide {
                currency,
                hours_per_week,
            } => AppCommand::Guide {
                currency,
                hours_per_week,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => hourpot::cli::setup::setup(cli.config_path.as_deref()).await,
        Some(cmd) => match AppCommand::try_from(cmd) {
            Ok(command) => hourpot::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
