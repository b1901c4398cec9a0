pub mod disk;
pub mod memory;

use crate::core::config::ResolvedBackend;
use crate::core::error::{Result, TrackerError};
use crate::core::models::{Category, CategoryDraft, CategoryId, LogEntry};
use crate::core::store::{Authenticator, LocalAuthenticator, TrackerStore};
use crate::providers::supabase::SupabaseClient;
use chrono::NaiveDate;
use disk::LocalStore;
use memory::MemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::debug;

/// Habits every new local or demo store starts with.
pub fn default_habits() -> Vec<CategoryDraft> {
    [
        ("Work", dec!(50), "Professional work activities"),
        ("Personal", dec!(20), "Personal productive activities"),
        ("Personal Development", dec!(30), "Learning and skill development"),
        ("Habit", dec!(25), "Healthy habits like gym, reading"),
        ("Social Media", dec!(-15), "Time spent on social media platforms"),
    ]
    .into_iter()
    .map(|(name, rate, description)| CategoryDraft {
        name: name.to_string(),
        rate,
        description: Some(description.to_string()),
    })
    .collect()
}

/// Rejects `draft` if another habit already uses its name.
pub(crate) fn ensure_unique_name<'a>(
    existing: impl IntoIterator<Item = &'a Category>,
    draft: &CategoryDraft,
    except: Option<CategoryId>,
) -> Result<()> {
    let wanted = draft.name.trim().to_lowercase();
    let clash = existing
        .into_iter()
        .any(|c| Some(c.id) != except && c.name.to_lowercase() == wanted);
    if clash {
        return Err(TrackerError::Conflict(format!(
            "a habit named '{}' already exists",
            draft.name.trim()
        )));
    }
    Ok(())
}

/// Rejects deleting a habit that logged activities still point at.
pub(crate) fn ensure_unreferenced<'a>(
    logs: impl IntoIterator<Item = &'a LogEntry>,
    id: CategoryId,
) -> Result<()> {
    let used_by = logs.into_iter().filter(|l| l.category_id == id).count();
    if used_by > 0 {
        return Err(TrackerError::Conflict(format!(
            "habit {id} is used by {used_by} logged activities"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Demo,
    Local,
    Supabase,
}

/// A storage backend paired with the authenticator that issues its sessions.
pub struct Backend {
    pub kind: BackendKind,
    pub store: Arc<dyn TrackerStore>,
    pub auth: Arc<dyn Authenticator>,
}

impl Backend {
    pub fn open(resolved: &ResolvedBackend, today: NaiveDate) -> Result<Self> {
        match resolved {
            ResolvedBackend::Demo => Ok(Self {
                kind: BackendKind::Demo,
                store: Arc::new(MemoryStore::with_demo_data(today)),
                auth: Arc::new(LocalAuthenticator),
            }),
            ResolvedBackend::Local { path } => Ok(Self {
                kind: BackendKind::Local,
                store: Arc::new(LocalStore::open(path)?),
                auth: Arc::new(LocalAuthenticator),
            }),
            ResolvedBackend::Supabase { url, key } => {
                debug!(%url, "Using Supabase backend");
                let client = Arc::new(SupabaseClient::new(url, key));
                Ok(Self {
                    kind: BackendKind::Supabase,
                    store: client.clone(),
                    auth: client,
                })
            }
        }
    }

    /// Hosted backends need a signed-in session; the others use the implicit local user.
    pub fn requires_login(&self) -> bool {
        self.kind == BackendKind::Supabase
    }
}
