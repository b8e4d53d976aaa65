use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::MismatchPolicy;

/// Contents of `imagestory.toml`. Every field is optional; command-line
/// flags take precedence over it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageStoryConfig {
    pub database: Option<String>,
    pub data_dir: Option<String>,
    pub reset_on_mismatch: Option<bool>,
}

impl ImageStoryConfig {
    pub fn mismatch_policy(&self) -> MismatchPolicy {
        match self.reset_on_mismatch {
            Some(true) => MismatchPolicy::Recreate,
            _ => MismatchPolicy::Fail,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("imagestory.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".imagestory").join("imagestory.db")
}

pub fn default_data_dir_in(base: &Path) -> PathBuf {
    base.join(".imagestory").join("assets")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ImageStoryConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ImageStoryConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ImageStoryConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("imagestory.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imagestory.toml");
        let config = ImageStoryConfig {
            database: Some("stories.db".to_string()),
            data_dir: None,
            reset_on_mismatch: Some(true),
        };

        write_config(&path, &config, false).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.mismatch_policy(), MismatchPolicy::Recreate);

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &ImageStoryConfig::default(), true).unwrap();
        let overwritten = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(overwritten.mismatch_policy(), MismatchPolicy::Fail);
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = default_database_path_in(dir.path());
        ensure_db_dir(&db_path).unwrap();
        assert!(dir.path().join(".imagestory").is_dir());
    }
}
