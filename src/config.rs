use crate::shortcuts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Lookup request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_auto_snap")]
    pub auto_snap: bool,

    #[serde(default = "default_auto_snap_initial_delay")]
    pub auto_snap_initial_delay_ms: u64,

    #[serde(default = "default_auto_snap_retry_delay")]
    pub auto_snap_retry_delay_ms: u64,

    #[serde(default = "default_notify_on_match")]
    pub notify_on_match: bool,

    #[serde(default = "default_notification_sound")]
    pub notification_sound_path: String,

    #[serde(default = "default_capture_device")]
    pub capture_device: String,

    #[serde(default = "default_capture_command")]
    pub capture_command: String,

    #[serde(default = "default_snap_shortcut")]
    pub snap_shortcut: String,

    #[serde(default = "default_help_shortcut")]
    pub help_shortcut: String,

    #[serde(default)]
    pub on_view_opened: Option<String>,

    #[serde(default)]
    pub on_view_closed: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_auto_snap() -> bool {
    true
}

fn default_auto_snap_initial_delay() -> u64 {
    3000
}

fn default_auto_snap_retry_delay() -> u64 {
    1000
}

fn default_notify_on_match() -> bool {
    true
}

fn default_notification_sound() -> String {
    "ping-up.opus".to_string()
}

fn default_capture_device() -> String {
    "/dev/video0".to_string()
}

fn default_capture_command() -> String {
    "ffmpeg -loglevel error -y -f v4l2 -i {device} -frames:v 1 {output}".to_string()
}

fn default_snap_shortcut() -> String {
    "CTRL+ALT+S".to_string()
}

fn default_help_shortcut() -> String {
    "CTRL+ALT+H".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            language: default_language(),
            timeout: default_timeout(),
            auto_snap: default_auto_snap(),
            auto_snap_initial_delay_ms: default_auto_snap_initial_delay(),
            auto_snap_retry_delay_ms: default_auto_snap_retry_delay(),
            notify_on_match: default_notify_on_match(),
            notification_sound_path: default_notification_sound(),
            capture_device: default_capture_device(),
            capture_command: default_capture_command(),
            snap_shortcut: default_snap_shortcut(),
            help_shortcut: default_help_shortcut(),
            on_view_opened: None,
            on_view_closed: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/snapodds/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("snapodds").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(anyhow::anyhow!("api_url cannot be empty"));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!("api_url must start with http:// or https://"));
        }

        if !self.capture_command.contains("{output}") {
            return Err(anyhow::anyhow!(
                "capture_command must contain the {{output}} placeholder"
            ));
        }

        if self.auto_snap_retry_delay_ms == 0 {
            return Err(anyhow::anyhow!("auto_snap_retry_delay_ms must be non-zero"));
        }

        shortcuts::parse_shortcut(&self.snap_shortcut).context("Invalid snap_shortcut")?;
        shortcuts::parse_shortcut(&self.help_shortcut).context("Invalid help_shortcut")?;

        Ok(())
    }

    pub fn auto_snap_delay(&self, initial: bool) -> Duration {
        if initial {
            Duration::from_millis(self.auto_snap_initial_delay_ms)
        } else {
            Duration::from_millis(self.auto_snap_retry_delay_ms)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
