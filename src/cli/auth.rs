//! Login state for hosted backends, kept as a JSON session file in the data directory.
use crate::core::error::TrackerError;
use crate::core::store::Session;
use crate::store::Backend;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use console::Term;
use std::path::PathBuf;
use tracing::{debug, info};

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            })?;
        }
        Ok(())
    }
}

/// The session store calls run under, refreshing an expired login.
pub async fn current_session(backend: &Backend, file: &SessionFile) -> Result<Session> {
    if !backend.requires_login() {
        return Ok(Session::local());
    }
    let Some(session) = file.load()? else {
        bail!("Not logged in. Run `hourpot login` first");
    };
    if !session.is_expired(Utc::now()) {
        return Ok(session);
    }

    debug!("Session expired, refreshing");
    match backend.auth.refresh(&session).await {
        Ok(refreshed) => {
            file.save(&refreshed)?;
            Ok(refreshed)
        }
        Err(TrackerError::Auth(message)) => {
            file.clear()?;
            bail!("Session expired ({message}). Run `hourpot login` again")
        }
        Err(e) => Err(e).context("Failed to refresh session"),
    }
}

fn prompt(label: &str, secret: bool) -> Result<String> {
    let term = Term::stderr();
    term.write_str(label)?;
    let value = if secret {
        term.read_secure_line()?
    } else {
        term.read_line()?
    };
    Ok(value.trim().to_string())
}

pub async fn login(
    backend: &Backend,
    file: &SessionFile,
    email: Option<String>,
    password: Option<String>,
    sign_up: bool,
) -> Result<()> {
    if !backend.requires_login() {
        println!("This backend has a single local user; no login is needed.");
        return Ok(());
    }

    let email = match email {
        Some(email) => email,
        None => prompt("Email: ", false)?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ", true)?,
    };
    if email.is_empty() || password.is_empty() {
        bail!("Email and password are required");
    }

    let session = if sign_up {
        backend.auth.sign_up(&email, &password).await
    } else {
        backend.auth.sign_in(&email, &password).await
    }
    .context(if sign_up { "Sign-up failed" } else { "Login failed" })?;

    file.save(&session)?;
    info!(user_id = %session.user_id, "Logged in");
    println!("Logged in as {}", session.email.as_deref().unwrap_or(&email));
    Ok(())
}

pub async fn logout(backend: &Backend, file: &SessionFile) -> Result<()> {
    let Some(session) = file.load()? else {
        println!("Not logged in.");
        return Ok(());
    };
    if backend.requires_login()
        && let Err(e) = backend.auth.sign_out(&session).await
    {
        // The local session is dropped regardless; the server token expires on its own.
        tracing::warn!(error = %e, "Server-side sign out failed");
    }
    file.clear()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(backend: &Backend, file: &SessionFile) -> Result<()> {
    if !backend.requires_login() {
        println!("Local user ({:?} backend)", backend.kind);
        return Ok(());
    }
    match file.load()? {
        Some(session) => {
            println!(
                "{} ({})",
                session.email.as_deref().unwrap_or("unknown email"),
                session.user_id
            );
            if let Some(expires_at) = session.expires_at {
                let state = if session.is_expired(Utc::now()) {
                    "expired"
                } else {
                    "valid until"
                };
                println!("Session {state} {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        None => println!("Not logged in."),
    }
    Ok(())
}
