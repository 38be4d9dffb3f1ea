//! Persisted user settings: defaults, loading from TOML/JSON, and the
//! stylesheet list + CSS custom properties derived from them.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use crate::format::sanitize_hex_color;

pub const ENV_SETTINGS_PATH: &str = "RATING_BAR_SETTINGS_PATH";
pub const DEFAULT_SETTINGS_TOML: &str = "config/settings.toml";
pub const DEFAULT_SETTINGS_JSON: &str = "config/settings.json";

/// Default cache TTL: 10 minutes.
pub const DEFAULT_CACHE_DURATION_MS: u64 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BarColor {
    #[default]
    BlueGray,
    GreenRed,
    CustomColors,
}

/// Flat key/value settings object, camelCase on disk. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub bar_position: BarPosition,
    pub bar_color: BarColor,
    pub bar_likes_color: String,
    pub bar_dislikes_color: String,
    pub bar_colors_separator: bool,
    /// Pixels; 0 hides the bar entirely.
    pub bar_height: u32,
    /// Percent, 0..=100.
    pub bar_opacity: u32,
    pub bar_separator: bool,
    pub use_exponential_scaling: bool,
    pub bar_tooltip: bool,
    pub use_on_video_page: bool,
    pub show_percentage: bool,
    /// Cache TTL in milliseconds.
    pub cache_duration: u64,
    /// Also rate `/shorts/<id>` links.
    pub rate_shorts: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            bar_position: BarPosition::Bottom,
            bar_color: BarColor::BlueGray,
            bar_likes_color: "#3095e3".to_string(),
            bar_dislikes_color: "#cfcfcf".to_string(),
            bar_colors_separator: false,
            bar_height: 4,
            bar_opacity: 100,
            bar_separator: false,
            use_exponential_scaling: false,
            bar_tooltip: true,
            use_on_video_page: false,
            show_percentage: false,
            cache_duration: DEFAULT_CACHE_DURATION_MS,
            rate_shorts: false,
        }
    }
}

impl UserSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_duration)
    }

    /// Thumbnails need processing at all (bar visible or percentages shown).
    pub fn annotates_thumbnails(&self) -> bool {
        self.bar_height != 0 || self.show_percentage
    }

    /// Host tooltips need augmenting.
    pub fn augments_tooltips(&self) -> bool {
        self.bar_tooltip || self.use_exponential_scaling
    }

    /// Stylesheets the page needs, in injection order.
    pub fn css_files(&self) -> Vec<String> {
        if self.bar_height == 0 {
            return Vec::new();
        }
        let mut files = Vec::new();
        let top = self.bar_position == BarPosition::Top;

        files.push("css/bar.css");
        files.push(if top { "css/bar-top.css" } else { "css/bar-bottom.css" });

        if self.bar_separator {
            files.push(if top {
                "css/bar-top-separator.css"
            } else {
                "css/bar-bottom-separator.css"
            });
        }

        if self.bar_tooltip {
            files.push("css/bar-tooltip.css");
            files.push(if top {
                "css/bar-top-tooltip.css"
            } else {
                "css/bar-bottom-tooltip.css"
            });
        }

        if self.use_on_video_page {
            files.push("css/bar-video-page.css");
        }

        files.into_iter().map(String::from).collect()
    }

    /// CSS custom properties set on the document root.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            ("--ytrb-bar-height", format!("{}px", self.bar_height)),
            (
                "--ytrb-bar-opacity",
                (self.bar_opacity as f64 / 100.0).to_string(),
            ),
        ];

        let (likes, dislikes, likes_shadow, dislikes_shadow) = match self.bar_color {
            BarColor::BlueGray => (
                "#3095e3".to_string(),
                "#cfcfcf".to_string(),
                "none",
                "none",
            ),
            BarColor::GreenRed => (
                "#060".to_string(),
                "#c00".to_string(),
                "1px 0 #fff",
                "inset 1px 0 #fff",
            ),
            BarColor::CustomColors => (
                sanitize_hex_color(&self.bar_likes_color),
                sanitize_hex_color(&self.bar_dislikes_color),
                if self.bar_colors_separator { "1px 0 #fff" } else { "none" },
                if self.bar_colors_separator {
                    "inset 1px 0 #fff"
                } else {
                    "none"
                },
            ),
        };
        vars.push(("--ytrb-bar-likes-color", likes));
        vars.push(("--ytrb-bar-dislikes-color", dislikes));
        vars.push(("--ytrb-bar-likes-shadow", likes_shadow.to_string()));
        vars.push(("--ytrb-bar-dislikes-shadow", dislikes_shadow.to_string()));
        vars
    }

    /// Load settings from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_settings(&content, ext.as_str())
    }

    /// Load settings using env var + fallbacks:
    /// 1) $RATING_BAR_SETTINGS_PATH
    /// 2) config/settings.toml
    /// 3) config/settings.json
    /// 4) defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = settings_path() {
            return Self::load_from(&path);
        }
        if std::env::var(ENV_SETTINGS_PATH).is_ok() {
            return Err(anyhow!("{ENV_SETTINGS_PATH} points to non-existent path"));
        }
        Ok(Self::default())
    }
}

/// The settings file that `load_default` would read, if any.
pub fn settings_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(ENV_SETTINGS_PATH) {
        let pb = PathBuf::from(p);
        return pb.exists().then_some(pb);
    }
    [DEFAULT_SETTINGS_TOML, DEFAULT_SETTINGS_JSON]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn parse_settings(s: &str, hint_ext: &str) -> Result<UserSettings> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).context("parsing settings json");
    }
    toml::from_str(s).context("parsing settings toml")
}

pub const ENV_HOT_RELOAD: &str = "RATING_BAR_HOT_RELOAD";

fn hot_reload_enabled() -> bool {
    std::env::var(ENV_HOT_RELOAD)
        .ok()
        .is_some_and(|v| v == "1")
}

/// Poll `path` every `poll` and call `on_change` with the freshly parsed
/// settings whenever its mtime moves forward. No-op unless
/// `RATING_BAR_HOT_RELOAD=1`. Unparseable edits are logged and skipped.
pub fn start_hot_reload_thread<F>(path: PathBuf, poll: Duration, mut on_change: F)
where
    F: FnMut(UserSettings) + Send + 'static,
{
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let mut last_mtime: Option<SystemTime> = None;
        loop {
            if let Ok(mtime) = fs::metadata(&path).and_then(|m| m.modified()) {
                let changed = last_mtime.is_some_and(|prev| mtime > prev);
                if last_mtime.is_none() || changed {
                    last_mtime = Some(mtime);
                }
                if changed {
                    match UserSettings::load_from(&path) {
                        Ok(settings) => {
                            tracing::info!(target: "service", path = %path.display(), "settings reloaded");
                            on_change(settings);
                        }
                        Err(e) => {
                            tracing::warn!(target: "service", "settings reload failed: {e:#}");
                        }
                    }
                }
            }
            thread::sleep(poll);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let s = parse_settings(r#"{"barHeight": 0, "showPercentage": true}"#, "json").unwrap();
        assert_eq!(s.bar_height, 0);
        assert!(s.show_percentage);
        assert!(s.bar_tooltip);
        assert_eq!(s.cache_duration, DEFAULT_CACHE_DURATION_MS);
    }

    #[test]
    fn toml_uses_camel_case_keys() {
        let s = parse_settings(
            "barPosition = \"top\"\nbarColor = \"green-red\"\ncacheDuration = 1000\n",
            "toml",
        )
        .unwrap();
        assert_eq!(s.bar_position, BarPosition::Top);
        assert_eq!(s.bar_color, BarColor::GreenRed);
        assert_eq!(s.cache_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn css_files_follow_position_and_features() {
        let mut s = UserSettings::default();
        assert_eq!(
            s.css_files(),
            vec![
                "css/bar.css",
                "css/bar-bottom.css",
                "css/bar-tooltip.css",
                "css/bar-bottom-tooltip.css"
            ]
        );

        s.bar_position = BarPosition::Top;
        s.bar_separator = true;
        s.bar_tooltip = false;
        s.use_on_video_page = true;
        assert_eq!(
            s.css_files(),
            vec![
                "css/bar.css",
                "css/bar-top.css",
                "css/bar-top-separator.css",
                "css/bar-video-page.css"
            ]
        );

        s.bar_height = 0;
        assert!(s.css_files().is_empty());
    }

    #[test]
    fn custom_colors_are_sanitized() {
        let s = UserSettings {
            bar_color: BarColor::CustomColors,
            bar_likes_color: "#00ff00;}".into(),
            bar_colors_separator: true,
            ..UserSettings::default()
        };
        let vars = s.css_variables();
        assert!(vars.contains(&("--ytrb-bar-likes-color", "#00ff00".to_string())));
        assert!(vars.contains(&("--ytrb-bar-likes-shadow", "1px 0 #fff".to_string())));
        assert!(vars.contains(&("--ytrb-bar-opacity", "1".to_string())));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_SETTINGS_PATH);

        // No files in the temp CWD -> defaults
        let v = UserSettings::load_default().unwrap();
        assert_eq!(v, UserSettings::default());

        // Env wins
        let p_json = tmp.path().join("mine.json");
        fs::write(&p_json, r#"{"barOpacity": 50}"#).unwrap();
        env::set_var(ENV_SETTINGS_PATH, p_json.display().to_string());
        let v2 = UserSettings::load_default().unwrap();
        assert_eq!(v2.bar_opacity, 50);

        // Env pointing nowhere is an error, not silent defaults
        env::set_var(ENV_SETTINGS_PATH, tmp.path().join("missing.toml"));
        assert!(UserSettings::load_default().is_err());
        env::remove_var(ENV_SETTINGS_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
