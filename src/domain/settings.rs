use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences. Stored values are merged over these defaults
/// key-by-key, so adding a setting never breaks previously stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: Theme,
    pub autoplay: bool,
    pub ads_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            autoplay: true,
            ads_enabled: true,
        }
    }
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(autoplay) = patch.autoplay {
            self.autoplay = autoplay;
        }
        if let Some(ads_enabled) = patch.ads_enabled {
            self.ads_enabled = ads_enabled;
        }
    }
}

/// Partial update, same shape the store's feed-metadata updates use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub autoplay: Option<bool>,
    pub ads_enabled: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none() && self.autoplay.is_none() && self.ads_enabled.is_none()
    }
}
