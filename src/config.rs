use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::layout::Insets;

pub const DEFAULT_CONFIG_FILE: &str = ".rtebridge.toml";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
/// Placeholder image host until uploads report real URLs
pub const DEFAULT_CDN_PREFIX: &str = "cdn.hk01.com/image/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

/// Everything the host feeds the editor page when it loads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub initial_title_html: String,
    #[serde(default)]
    pub initial_content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    #[serde(default)]
    pub hidden_title: bool,
    #[serde(default)]
    pub enable_on_change: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_height: Option<f64>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default = "default_grid_width")]
    pub grid_width: f64,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_cdn_prefix")]
    pub cdn_prefix: String,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_window_height")]
    pub window_height: f64,
    #[serde(default)]
    pub content_inset: Insets,
    #[serde(default)]
    pub margin: Insets,
}

fn default_grid_width() -> f64 {
    120.0
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

fn default_cdn_prefix() -> String {
    DEFAULT_CDN_PREFIX.to_string()
}

fn default_window_height() -> f64 {
    640.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            window_height: default_window_height(),
            content_inset: Insets::default(),
            margin: Insets::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_title_html: String::new(),
            initial_content_html: String::new(),
            title_placeholder: None,
            content_placeholder: None,
            custom_css: None,
            hidden_title: false,
            enable_on_change: false,
            footer_height: None,
            platform: Platform::default(),
            grid_width: default_grid_width(),
            query_timeout_ms: default_query_timeout_ms(),
            cdn_prefix: default_cdn_prefix(),
            layout: LayoutConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: EditorConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.query_timeout_ms == 0 {
            anyhow::bail!("query_timeout_ms must be greater than zero");
        }
        if !self.grid_width.is_finite() || self.grid_width <= 0.0 {
            anyhow::bail!("grid_width must be a positive number, got {}", self.grid_width);
        }
        if !self.layout.window_height.is_finite() || self.layout.window_height < 0.0 {
            anyhow::bail!(
                "layout.window_height must be a non-negative number, got {}",
                self.layout.window_height
            );
        }
        if let Some(height) = self.footer_height {
            if !height.is_finite() || height < 0.0 {
                anyhow::bail!("footer_height must be a non-negative number, got {}", height);
            }
        }
        Ok(())
    }
}
