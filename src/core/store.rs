//! Storage and session abstractions

use crate::core::error::{Result, TrackerError};
use crate::core::models::{
    Category, CategoryDraft, CategoryId, LogEntry, LogId, PricedLog, Settings, SettingsUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LOCAL_USER_ID: &str = "local";

/// An authenticated user. Passed explicitly into every store call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session for backends without accounts.
    pub fn local() -> Self {
        Self {
            user_id: LOCAL_USER_ID.to_string(),
            email: None,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn bearer(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| TrackerError::Auth("not signed in".to_string()))
    }
}

#[async_trait]
pub trait TrackerStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn add_category(&self, draft: CategoryDraft) -> Result<Category>;
    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category>;
    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    async fn list_logs(&self, session: &Session) -> Result<Vec<LogEntry>>;
    async fn get_log(&self, session: &Session, id: LogId) -> Result<LogEntry>;
    async fn insert_log(&self, session: &Session, log: PricedLog) -> Result<LogEntry>;
    async fn update_log(&self, session: &Session, id: LogId, log: PricedLog) -> Result<LogEntry>;
    async fn delete_log(&self, session: &Session, id: LogId) -> Result<()>;

    /// Returns the user's settings, creating the defaults on first access.
    async fn get_settings(&self, session: &Session) -> Result<Settings>;
    async fn upsert_settings(&self, session: &Session, update: SettingsUpdate) -> Result<Settings>;

    async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| TrackerError::not_found(format!("habit with id {id}")))
    }

    /// Case-insensitive lookup by habit name.
    async fn find_category(&self, name: &str) -> Result<Category> {
        let categories = self.list_categories().await?;
        let wanted = name.trim().to_lowercase();
        if let Some(found) = categories
            .iter()
            .find(|c| c.name.to_lowercase() == wanted)
        {
            return Ok(found.clone());
        }
        let available: Vec<String> = categories.iter().map(|c| c.name.to_lowercase()).collect();
        Err(TrackerError::not_found(format!(
            "habit '{name}'. Available habits: {}",
            available.join(", ")
        )))
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    async fn refresh(&self, session: &Session) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

/// Authenticator for backends that have a single implicit user.
pub struct LocalAuthenticator;

#[async_trait]
impl Authenticator for LocalAuthenticator {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
        Ok(Session {
            email: Some(email.to_string()),
            ..Session::local()
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.sign_in(email, password).await
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        Ok(session.clone())
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}
