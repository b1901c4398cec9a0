use crate::core::config::{AppConfig, ResolvedBackend};
use crate::store::disk::LocalStore;
use anyhow::{Context, Result};
use std::path::Path;

// Include the example config as a string literal in the binary
const DEFAULT_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the default configuration at `config_path` (or the platform default location)
/// and prepares the store it points at.
pub async fn setup(config_path: Option<&str>) -> Result<()> {
    let path = match config_path {
        Some(path) => path.into(),
        None => AppConfig::default_config_path()?,
    };
    setup_at_path(&path)?;

    let config = AppConfig::load_from_path(&path)?;
    let added = seed_local_store(&config).await?;
    println!("Created configuration at {}", path.display());
    if added > 0 {
        println!("Added {added} starter habits. See them with `hourpot habit list`.");
    }
    Ok(())
}

/// Creates a default configuration file with example content at the specified path
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

/// Seeds the default habits when `config` uses the local backend. Returns how many were added.
pub async fn seed_local_store(config: &AppConfig) -> Result<usize> {
    let ResolvedBackend::Local { path } = config.resolve_backend()? else {
        return Ok(0);
    };
    let store = LocalStore::open(&path)
        .with_context(|| format!("Failed to open local store at {}", path.display()))?;
    Ok(store.seed_default_habits().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BackendConfig;
    use crate::core::store::TrackerStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        setup_at_path(&config_path)?;

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("backend:"));
        assert!(content.contains("recent_limit:"));
        assert!(content.contains("# Example configuration file for hourpot"));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        std::fs::write(&config_path, "test")?;

        let result = setup_at_path(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));

        Ok(())
    }

    #[test]
    fn test_example_config_is_valid_yaml() -> Result<()> {
        let config: AppConfig = serde_yaml::from_str(DEFAULT_CONFIG)
            .context("Failed to parse example config as YAML")?;

        assert_eq!(config.backend, BackendConfig::Local);
        assert_eq!(config.recent_limit, 20);
        assert!(config.data_path.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_local_store_once() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = AppConfig {
            data_path: Some(temp_dir.path().to_string_lossy().into_owned()),
            ..AppConfig::default()
        };

        assert_eq!(seed_local_store(&config).await?, 5);

        let store = LocalStore::open(&temp_dir.path().join("store"))?;
        assert_eq!(store.list_categories().await?.len(), 5);
        drop(store);

        assert_eq!(seed_local_store(&config).await?, 0);

        let demo = AppConfig {
            backend: BackendConfig::Demo,
            ..AppConfig::default()
        };
        assert_eq!(seed_local_store(&demo).await?, 0);
        Ok(())
    }
}
