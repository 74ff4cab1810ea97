use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MarqueeError;
use crate::marquee::overlay::OverlayLayout;

fn default_server_url() -> String {
    "http://127.0.0.1:8188".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_display_width() -> f32 {
    1200.0
}

fn default_max_display_height() -> f32 {
    900.0
}

fn default_viewport_fraction() -> f32 {
    0.85
}

fn default_initial_box_side() -> f32 {
    512.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the graph server the overlay reports to.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Largest preview size in logical points.
    #[serde(default = "default_max_display_width")]
    pub max_display_width: f32,
    #[serde(default = "default_max_display_height")]
    pub max_display_height: f32,
    /// Share of the window the preview may cover.
    #[serde(default = "default_viewport_fraction")]
    pub viewport_fraction: f32,
    /// Side of the square selection placed when a preview opens.
    #[serde(default = "default_initial_box_side")]
    pub initial_box_side: f32,
    /// Round the previewed output size down to a multiple of 8.
    #[serde(default = "default_true")]
    pub force_multiple_of_8: bool,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
            max_display_width: default_max_display_width(),
            max_display_height: default_max_display_height(),
            viewport_fraction: default_viewport_fraction(),
            initial_box_side: default_initial_box_side(),
            force_multiple_of_8: true,
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    /// A missing or empty file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), MarqueeError> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| MarqueeError::Config(format!("server_url '{}': {e}", self.server_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MarqueeError::Config(format!(
                "server_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(MarqueeError::Config("request_timeout_secs must be positive".into()));
        }
        let sizes = [
            ("max_display_width", self.max_display_width),
            ("max_display_height", self.max_display_height),
            ("initial_box_side", self.initial_box_side),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return Err(MarqueeError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.viewport_fraction > 0.0 && self.viewport_fraction <= 1.0) {
            return Err(MarqueeError::Config(format!(
                "viewport_fraction must be in (0, 1], got {}",
                self.viewport_fraction
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn layout(&self) -> OverlayLayout {
        OverlayLayout {
            viewport_fraction: self.viewport_fraction,
            max_display_width: self.max_display_width,
            max_display_height: self.max_display_height,
            initial_side: self.initial_box_side,
        }
    }
}
