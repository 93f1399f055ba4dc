use crate::controller::CollectorSettings;
use crate::engine::EngineSettings;
use crate::persistence::profile_store::get_home_dir;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = ".config/opendpad";
const MAIN_CONFIG_FILE: &str = "settings.toml";

/// Application settings, read from `~/.config/opendpad/settings.toml`.
/// Every field has a default so a partial file is fine.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Profile file; `None` uses the default profile location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<PathBuf>,
    pub engine: EngineSettings,
    pub collector: CollectorSettings,
}

impl AppSettings {
    pub fn default_path() -> PathBuf {
        let mut path = get_home_dir();
        path.push(CONFIG_DIR);
        path.push(MAIN_CONFIG_FILE);
        path
    }

    /// Loads settings from `path`, or defaults when the file is missing.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;

        let settings: Self =
            toml::from_str(&content).map_err(|e| eyre!("Failed to parse settings file: {}", e))?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }
}
