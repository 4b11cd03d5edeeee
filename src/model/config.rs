use serde::{Deserialize, Serialize};

/// Application configuration from `config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub tiki: TikiConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. `info` or `tiki=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderConfig {
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        HeaderConfig { visible: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TikiConfig {
    #[serde(default = "default_max_points")]
    pub max_points: u32,
}

impl Default for TikiConfig {
    fn default() -> Self {
        TikiConfig {
            max_points: default_max_points(),
        }
    }
}

fn default_max_points() -> u32 {
    10
}

/// Terminal color scheme selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Auto,
    Dark,
    Light,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceConfig {
    #[serde(default)]
    pub theme: ThemeChoice,
    #[serde(default)]
    pub color_thresholds: ColorThresholds,
}

/// Cut-offs that decide when a card value is drawn in a warning color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorThresholds {
    /// Priorities at or below this value are highlighted
    #[serde(default = "default_high_priority")]
    pub high_priority: u8,
    /// Estimates at or above this value are highlighted
    #[serde(default = "default_large_points")]
    pub large_points: u32,
    /// Tickets not updated for this many days are dimmed
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        ColorThresholds {
            high_priority: default_high_priority(),
            large_points: default_large_points(),
            stale_days: default_stale_days(),
        }
    }
}

fn default_high_priority() -> u8 {
    2
}

fn default_large_points() -> u32 {
    8
}

fn default_stale_days() -> i64 {
    14
}
