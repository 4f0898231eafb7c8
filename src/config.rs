use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub badge: Badge,
    #[serde(default)]
    pub publish: Publish,
}

#[derive(Debug, Deserialize)]
pub struct Project {
    #[serde(default = "default_project_name")]
    pub name: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

/// Badge color thresholds, whole percentages
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_yellow")]
    pub yellow: i64,
    #[serde(default = "default_green")]
    pub green: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            yellow: default_yellow(),
            green: default_green(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Badge {
    /// Use shields.io badges instead of the locally hosted icon
    #[serde(default = "default_true")]
    pub use_shields_io: bool,
    #[serde(default)]
    pub icon_base_url: Option<String>,
}

impl Default for Badge {
    fn default() -> Self {
        Self {
            use_shields_io: true,
            icon_base_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Publish {
    #[serde(default)]
    pub channel: Channel,
    /// Link target for comment badges
    #[serde(default)]
    pub build_url: Option<String>,
}

/// Which rendering of the comparison gets printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Console,
    Status,
    Comment,
    Build,
}

fn default_project_name() -> String {
    "coverage".to_string()
}

fn default_yellow() -> i64 {
    80
}

fn default_green() -> i64 {
    90
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let Thresholds { yellow, green } = self.thresholds;
        if !(0..=100).contains(&yellow) || !(0..=100).contains(&green) {
            anyhow::bail!(
                "Thresholds must be between 0 and 100 (yellow = {}, green = {})",
                yellow,
                green
            );
        }
        if yellow > green {
            anyhow::bail!(
                "Yellow threshold {} must not be above green threshold {}",
                yellow,
                green
            );
        }
        if !self.badge.use_shields_io && self.badge.icon_base_url.is_none() {
            anyhow::bail!("badge.icon_base_url is required when badge.use_shields_io = false");
        }
        Ok(())
    }
}
