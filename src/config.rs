use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resize;

const DEFAULT_ENV_PREFIX: &str = "LECTOR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            tick_rate: default_tick_rate(),
        }
    }
}

fn default_theme() -> String {
    "dark".into()
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

/// Article panel width bounds in layout units. Validated (and replaced by
/// the built-in constants when inconsistent) in `resize::WidthBounds`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_min_article_width")]
    pub min_article_width: u16,
    #[serde(default = "default_max_article_width")]
    pub max_article_width: u16,
    #[serde(default = "default_article_width")]
    pub default_article_width: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_article_width: default_min_article_width(),
            max_article_width: default_max_article_width(),
            default_article_width: default_article_width(),
        }
    }
}

fn default_min_article_width() -> u16 {
    resize::MIN_ARTICLE_WIDTH
}

fn default_max_article_width() -> u16 {
    resize::MAX_ARTICLE_WIDTH
}

fn default_article_width() -> u16 {
    resize::DEFAULT_ARTICLE_WIDTH
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }
    if other.ui.tick_rate != Duration::ZERO {
        base.ui.tick_rate = other.ui.tick_rate;
    }

    if other.layout.min_article_width != 0 {
        base.layout.min_article_width = other.layout.min_article_width;
    }
    if other.layout.max_article_width != 0 {
        base.layout.max_article_width = other.layout.max_article_width;
    }
    if other.layout.default_article_width != 0 {
        base.layout.default_article_width = other.layout.default_article_width;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "ui.theme" => cfg.ui.theme = value,
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "layout.min_article_width" => {
            if let Ok(parsed) = value.parse::<u16>() {
                cfg.layout.min_article_width = parsed;
            }
        }
        "layout.max_article_width" => {
            if let Ok(parsed) = value.parse::<u16>() {
                cfg.layout.max_article_width = parsed;
            }
        }
        "layout.default_article_width" => {
            if let Ok(parsed) = value.parse::<u16>() {
                cfg.layout.default_article_width = parsed;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lector").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/config.yaml")),
            env_prefix: Some("LECTOR_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "dark");
        assert_eq!(cfg.layout.default_article_width, 860);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "ui:\n  theme: light\nlayout:\n  default_article_width: 1000\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("LECTOR_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "light");
        assert_eq!(cfg.layout.default_article_width, 1000);
        assert_eq!(cfg.layout.min_article_width, 600);
    }

    #[test]
    fn env_overrides() {
        env::set_var("LECTOR_ENVTEST_UI__THEME", "light");
        env::set_var("LECTOR_ENVTEST_LAYOUT__MAX_ARTICLE_WIDTH", "1200");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/config.yaml")),
            env_prefix: Some("LECTOR_ENVTEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "light");
        assert_eq!(cfg.layout.max_article_width, 1200);
        env::remove_var("LECTOR_ENVTEST_UI__THEME");
        env::remove_var("LECTOR_ENVTEST_LAYOUT__MAX_ARTICLE_WIDTH");
    }
}
