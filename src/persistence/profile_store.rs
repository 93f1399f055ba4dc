use super::ProfileConfig;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PROFILE_DIR: &str = ".config/opendpad/profiles";
const DEFAULT_PROFILE_FILE: &str = "default.toml";

/// Reads and writes profile files. A missing file is an empty profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.config/opendpad/profiles/default.toml`
    pub fn default_location() -> Self {
        let mut path = get_home_dir();
        path.push(PROFILE_DIR);
        path.push(DEFAULT_PROFILE_FILE);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<ProfileConfig> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if profile file exists: {}", e))?
        {
            warn!(
                "Profile file {} does not exist, using default",
                self.path.display()
            );
            return Ok(ProfileConfig::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read profile file: {}", e))?;

        let profile: ProfileConfig =
            toml::from_str(&content).map_err(|e| eyre!("Failed to parse profile file: {}", e))?;

        debug!(
            "Loaded profile with {} configured set(s) from {}",
            profile.sets.len(),
            self.path.display()
        );
        Ok(profile)
    }

    /// Loads the profile, falling back to an empty one if the file is unreadable.
    pub async fn load_or_default(&self) -> ProfileConfig {
        match self.load().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Ignoring profile {}: {}", self.path.display(), e);
                ProfileConfig::default()
            }
        }
    }

    pub async fn save(&self, profile: &ProfileConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !tokio::fs::try_exists(parent)
                .await
                .map_err(|e| eyre!("Failed to check if profile directory exists: {}", e))?
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| eyre!("Failed to create profile directory: {}", e))?;
            }
        }

        let content = toml::to_string_pretty(profile)
            .map_err(|e| eyre!("Failed to serialize profile: {}", e))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write profile file: {}", e))?;

        info!("Profile saved to {}", self.path.display());
        Ok(())
    }
}

pub(crate) fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{DpadConfig, SetConfig};

    #[tokio::test]
    async fn missing_file_is_empty_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("absent.toml"));

        let profile = store.load().await.unwrap();
        assert_eq!(profile, ProfileConfig::default());
    }

    #[tokio::test]
    async fn save_creates_directories_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("nested/deeper/profile.toml"));

        let profile = ProfileConfig {
            name: Some("Racing".to_string()),
            sets: vec![SetConfig {
                index: 2,
                dpads: vec![DpadConfig {
                    index: 1,
                    mode: Some("four-way".to_string()),
                    delay: Some(toml::Value::Integer(30)),
                    ..Default::default()
                }],
            }],
        };

        store.save(&profile).await.unwrap();
        assert_eq!(store.load().await.unwrap(), profile);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[[set]\nindex = ").await.unwrap();

        let store = ProfileStore::new(&path);
        assert!(store.load().await.is_err());
        assert_eq!(store.load_or_default().await, ProfileConfig::default());
    }
}
