use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::DEFAULT_URL;
use crate::dashboard::DashboardSettings;
use crate::display::DisplaySettings;
use crate::edit::AutosaveSettings;
use crate::layout::DEFAULT_LOCALE;
use crate::store::default_state_dir;

const APP_NAME: &str = "config-center";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the Config Center service
    pub server_url: String,
    /// Locale used to order panels of equal size by name
    pub locale: String,
    /// Save edits automatically after a quiet period
    pub autosave: bool,
    /// Quiet period before an autosave, in milliseconds
    pub autosave_delay_ms: u64,
    /// How many modules are measured concurrently after the first render
    pub length_batch_size: usize,
    /// Emit highlighted markup
    pub highlight: bool,
    /// Show structured values as JSON instead of the secondary format
    pub view_json: bool,
    /// Where layout and notes are kept. Defaults to the user data directory.
    pub state_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_URL.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            autosave: true,
            autosave_delay_ms: 600,
            length_batch_size: 6,
            highlight: true,
            view_json: true,
            state_dir: None,
        }
    }
}

impl AppConfig {
    /// Settings from `<config_dir>/config-center/config.json`, with
    /// `CONFIG_CENTER_URL` taking precedence over the stored server URL.
    /// An absent or unreadable file yields the defaults.
    pub fn load() -> Self {
        let mut config = match get_config_path().and_then(|path| Self::read_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unusable settings file: {:#}", e);
                Self::default()
            }
        };
        if let Ok(url) = std::env::var("CONFIG_CENTER_URL") {
            config.server_url = url;
        }
        config
    }

    /// Settings stored at `path`. Keys missing from the file keep their
    /// defaults, and a missing file means all defaults.
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Settings in {} are not valid JSON", path.display()))
    }

    /// Write the settings to the user's config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = get_config_path()?;
        self.write_to(&path)?;
        Ok(path)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create settings directory {}", dir.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Cannot encode settings")?;
        fs::write(path, content)
            .with_context(|| format!("Cannot write settings to {}", path.display()))
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            locale: self.locale.clone(),
            display: DisplaySettings {
                view_json: self.view_json,
                highlight: self.highlight,
            },
            autosave: AutosaveSettings {
                enabled: self.autosave,
                delay: Duration::from_millis(self.autosave_delay_ms),
            },
            length_batch_size: self.length_batch_size.max(1),
        }
    }
}

/// `<config_dir>/config-center/config.json`.
pub fn get_config_path() -> Result<PathBuf> {
    let base = config_dir().context("This platform has no user config directory")?;
    Ok(base.join(APP_NAME).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"locale": "en-US", "autosave": false}"#).unwrap();
        assert_eq!(config.locale, "en-US");
        assert!(!config.autosave);
        assert_eq!(config.autosave_delay_ms, 600);
        assert_eq!(config.length_batch_size, 6);
        assert_eq!(AppConfig::default().locale, "tr");
    }

    #[test]
    fn test_settings_survive_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = AppConfig {
            server_url: "http://config.local:9000".to_string(),
            autosave_delay_ms: 250,
            ..AppConfig::default()
        };

        config.write_to(&path).unwrap();

        assert_eq!(AppConfig::read_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::read_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::read_from(&path).unwrap_err();

        assert!(format!("{:#}", err).contains("are not valid JSON"));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_dashboard_settings_never_use_zero_batches() {
        let config = AppConfig {
            length_batch_size: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.dashboard_settings().length_batch_size, 1);
    }
}
