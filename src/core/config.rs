use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Placeholder credential that selects the demo backend.
pub const DEMO_MODE_MARKER: &str = "demo_mode";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Sample data kept in memory; nothing is saved.
    Demo,
    /// Embedded store under the data directory.
    #[default]
    Local,
    /// Hosted Supabase project. Missing values fall back to `SUPABASE_URL` / `SUPABASE_KEY`.
    Supabase {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        key: Option<String>,
    },
}

/// Backend settings after environment fallbacks are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBackend {
    Demo,
    Local { path: PathBuf },
    Supabase { url: String, key: String },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    pub data_path: Option<String>,
}

fn default_recent_limit() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            recent_limit: default_recent_limit(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "hourpot", "hourpot")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        Ok(self.default_data_path()?.join("session.json"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn resolve_backend(&self) -> Result<ResolvedBackend> {
        self.resolve_backend_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_backend_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedBackend> {
        match &self.backend {
            BackendConfig::Demo => Ok(ResolvedBackend::Demo),
            BackendConfig::Local => Ok(ResolvedBackend::Local {
                path: self.default_data_path()?.join("store"),
            }),
            BackendConfig::Supabase { url, key } => {
                let url = url.clone().or_else(|| env("SUPABASE_URL"));
                let key = key.clone().or_else(|| env("SUPABASE_KEY"));
                match (url, key) {
                    (Some(url), Some(key)) if url == DEMO_MODE_MARKER || key == DEMO_MODE_MARKER => {
                        Ok(ResolvedBackend::Demo)
                    }
                    (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                        Ok(ResolvedBackend::Supabase {
                            url: url.trim_end_matches('/').to_string(),
                            key,
                        })
                    }
                    _ => bail!(
                        "Supabase backend needs a url and key in the config file or SUPABASE_URL and SUPABASE_KEY in the environment"
                    ),
                }
            }
        }
    }
}
