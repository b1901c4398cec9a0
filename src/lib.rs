pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::activity::{ActivityEdit, BulkEdit};
use crate::cli::auth::{SessionFile, current_session};
use crate::cli::habits::HabitEdit;
use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::models::{CategoryId, Currency, LogId, SettingsUpdate};
use crate::store::{Backend, BackendKind};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

pub enum AppCommand {
    Login {
        email: Option<String>,
        password: Option<String>,
        sign_up: bool,
    },
    Logout,
    WhoAmI,
    Dashboard {
        today: Option<NaiveDate>,
        goal_date: Option<NaiveDate>,
    },
    Log {
        hours: Decimal,
        category: String,
        note: Option<String>,
        date: Option<NaiveDate>,
    },
    ActivityList {
        limit: Option<usize>,
    },
    ActivityEdit {
        id: LogId,
        changes: ActivityEdit,
    },
    ActivityDelete {
        id: LogId,
    },
    ActivityBulk {
        ids: Vec<LogId>,
        edit: BulkEdit,
    },
    HabitList,
    HabitAdd {
        name: String,
        rate: Decimal,
        description: Option<String>,
    },
    HabitUpdate {
        id: CategoryId,
        changes: HabitEdit,
    },
    HabitDelete {
        id: CategoryId,
    },
    SettingsShow,
    SettingsSet(SettingsUpdate),
    Guide {
        currency: Option<Currency>,
        hours_per_week: Option<Decimal>,
    },
}

impl AppCommand {
    fn writes(&self) -> bool {
        matches!(
            self,
            AppCommand::Log { .. }
                | AppCommand::ActivityEdit { .. }
                | AppCommand::ActivityDelete { .. }
                | AppCommand::ActivityBulk { .. }
                | AppCommand::HabitAdd { .. }
                | AppCommand::HabitUpdate { .. }
                | AppCommand::HabitDelete { .. }
                | AppCommand::SettingsSet(_)
        )
    }
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("hourpot starting...");

    if let AppCommand::Guide {
        currency,
        hours_per_week,
    } = command
    {
        cli::guide::run(currency.unwrap_or_default(), hours_per_week);
        return Ok(());
    }

    let config = load_config(config_path)?;
    let today = chrono::Local::now().date_naive();
    let backend = Backend::open(&config.resolve_backend()?, today)
        .context("Failed to open storage backend")?;
    let session_file = SessionFile::new(config.session_path()?);

    match command {
        AppCommand::Login {
            email,
            password,
            sign_up,
        } => return cli::auth::login(&backend, &session_file, email, password, sign_up).await,
        AppCommand::Logout => return cli::auth::logout(&backend, &session_file).await,
        AppCommand::WhoAmI => return cli::auth::whoami(&backend, &session_file).await,
        _ => {}
    }

    let session = current_session(&backend, &session_file).await?;
    let store = backend.store.as_ref();
    let writes = command.writes();

    match command {
        AppCommand::Dashboard {
            today: as_of,
            goal_date,
        } => cli::dashboard::run(store, &session, as_of.unwrap_or(today), goal_date).await?,
        AppCommand::Log {
            hours,
            category,
            note,
            date,
        } => {
            cli::activity::log(store, &session, hours, &category, note, date.unwrap_or(today))
                .await?
        }
        AppCommand::ActivityList { limit } => {
            cli::activity::list(store, &session, limit.unwrap_or(config.recent_limit)).await?
        }
        AppCommand::ActivityEdit { id, changes } => {
            cli::activity::edit(store, &session, id, changes).await?
        }
        AppCommand::ActivityDelete { id } => cli::activity::delete(store, &session, id).await?,
        AppCommand::ActivityBulk { ids, edit } => {
            cli::activity::bulk(store, &session, &ids, edit).await?
        }
        AppCommand::HabitList => cli::habits::list(store, &session).await?,
        AppCommand::HabitAdd {
            name,
            rate,
            description,
        } => cli::habits::add(store, name, rate, description).await?,
        AppCommand::HabitUpdate { id, changes } => cli::habits::update(store, id, changes).await?,
        AppCommand::HabitDelete { id } => cli::habits::delete(store, id).await?,
        AppCommand::SettingsShow => cli::settings::show(store, &session).await?,
        AppCommand::SettingsSet(update) => cli::settings::set(store, &session, update).await?,
        AppCommand::Login { .. }
        | AppCommand::Logout
        | AppCommand::WhoAmI
        | AppCommand::Guide { .. } => {}
    }

    if writes && backend.kind == BackendKind::Demo {
        println!(
            "{}",
            ui::style_text(
                "Demo mode: changes last only for this command.",
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
