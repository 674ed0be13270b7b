//! Configuration management.
//!
//! Configuration is read from `~/.config/viewdeck/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields in the config file use default values.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{item, Settings, Theme};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: ChannelConfig,
    pub feed: FeedConfig,
    pub proxy: ProxyConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// YouTube channel id (the `UC...` form).
    pub id: String,
    /// Display name used when the feed doesn't carry a title.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Explicit feed URL; overrides the one derived from `channel.id`.
    pub url: Option<String>,
    /// How long a fetched snapshot is served before a refetch.
    pub cache_ttl_minutes: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            cache_ttl_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

/// Initial user settings; the store merges persisted values over these.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub theme: Theme,
    pub autoplay: bool,
    pub ads_enabled: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            theme: settings.theme,
            autoplay: settings.autoplay,
            ads_enabled: settings.ads_enabled,
        }
    }
}

impl DefaultsConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            theme: self.theme,
            autoplay: self.autoplay,
            ads_enabled: self.ads_enabled,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// The feed URL to fetch: an explicit `feed.url` wins, otherwise one
    /// is derived from `channel.id`. `None` when neither is configured.
    pub fn feed_url(&self) -> Option<String> {
        if let Some(url) = self.feed.url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        if !self.channel.id.is_empty() {
            return Some(item::channel_feed_url(&self.channel.id));
        }
        None
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.feed.cache_ttl_minutes as i64)
    }

    /// Get the default config file path: `~/.config/viewdeck/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("viewdeck").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Viewdeck Configuration

[channel]
# YouTube channel id, e.g. "UCyxR3ualvHiBvzyhx69aEIw".
# The feed URL is derived from this unless feed.url is set.
id = ""
# Display name used when the feed has no title.
name = ""

[feed]
# Explicit feed URL; overrides the one derived from channel.id.
# url = "https://www.youtube.com/feeds/videos.xml?channel_id=..."
# How long a fetched snapshot is served before refetching.
cache_ttl_minutes = 15

[proxy]
bind = "127.0.0.1"
port = 3001

[defaults]
# Initial settings; changes made at runtime are persisted separately.
# theme: "light", "dark", or "system"
theme = "dark"
autoplay = true
ads_enabled = true
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.feed.cache_ttl_minutes, 15);
        assert_eq!(config.proxy.port, 3001);
        assert_eq!(config.defaults.theme, Theme::Dark);
        assert!(config.feed_url().is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r#"
[channel]
id = "UC123"
"#;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(
            config.feed_url().as_deref(),
            Some("https://www.youtube.com/feeds/videos.xml?channel_id=UC123")
        );
        // Defaults fill the rest.
        assert_eq!(config.feed.cache_ttl_minutes, 15);
        assert!(config.defaults.autoplay);
    }

    #[test]
    fn test_explicit_feed_url_wins() {
        let content = r#"
[channel]
id = "UC123"

[feed]
url = "https://example.com/custom.xml"
"#;
        let config: Config = toml::from_str(content).expect("Config should parse");
        assert_eq!(
            config.feed_url().as_deref(),
            Some("https://example.com/custom.xml")
        );
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(config.feed_url().is_none());
        assert_eq!(config.defaults.settings(), Settings::default());
    }
}
