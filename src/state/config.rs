/// User-tunable settings for the media wall
///
/// Stored as JSON in the platform config directory. Every field is optional
/// in the file; missing fields fall back to the defaults below.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::error::ConfigError;
use super::library::Library;

const DB_ENV: &str = "MEDIA_WALL_DB";
const COVER_SERVICE_ENV: &str = "MEDIA_WALL_COVER_SERVICE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    // ========== Catalog ==========
    /// Catalog location (None = platform data directory)
    pub database_path: Option<PathBuf>,

    /// Records requested per page
    pub page_size: usize,

    /// Extra attempts after a failed page fetch
    pub fetch_retries: u32,

    // ========== Windowing ==========
    /// Loaded length above which only a window of the list is mounted
    pub virtualization_threshold: usize,

    /// Items rendered beyond each edge of the viewport
    pub overscan: usize,

    /// Estimated height of one grid row, gap included (px)
    pub estimated_item_height: f32,

    /// Card width (px)
    pub card_width: f32,

    /// Gap between cards (px)
    pub spacing: f32,

    /// Covers preloaded beyond each edge of the rendered range
    pub preload_margin: usize,

    /// Force touch (true) or pointer (false) mode; None detects touch input
    pub touch_mode: Option<bool>,

    // ========== Gestures ==========
    /// Pull distance that loads the next page on release (px)
    pub pull_threshold: f32,

    /// Maximum pull distance (px)
    pub max_pull: f32,

    /// Release speed that counts as a fling to the bottom (px/s)
    pub speed_threshold: f32,

    // ========== Hover preview ==========
    /// Hover time before a preview is resolved (ms)
    pub preview_delay_ms: u64,

    /// How long a resolved media source stays fresh (s)
    pub source_ttl_secs: u64,

    // ========== Cover service ==========
    /// Base URL of the cover generation service
    pub cover_service_url: String,

    /// Frame timestamp the cover is grabbed at
    pub cover_timestamp: String,

    /// Limit on any single cover request, download or regeneration (s)
    pub cover_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            page_size: 5,
            fetch_retries: 1,
            virtualization_threshold: 100,
            overscan: 20,
            estimated_item_height: 250.0,
            card_width: 300.0,
            spacing: 8.0,
            preload_margin: 10,
            touch_mode: None,
            pull_threshold: 120.0,
            max_pull: 180.0,
            speed_threshold: 1200.0,
            preview_delay_ms: 500,
            source_ttl_secs: 5 * 60,
            cover_service_url: "http://127.0.0.1:8787/cover-service".to_string(),
            cover_timestamp: "00:00:05".to_string(),
            cover_timeout_secs: 20,
        }
    }
}

impl Config {
    /// Convert to JSON string for storage
    #[cfg(test)]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Location of the configuration file
    /// Returns ~/.config/media-wall/config.json on Linux
    pub fn path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("media-wall");
        path.push("config.json");
        Some(path)
    }

    /// Load the configuration file (defaults when absent), then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => {
                let json = std::fs::read_to_string(&path)?;
                log::info!("⚙️  Loaded configuration from {}", path.display());
                Self::from_json(&json)?
            }
            _ => Self::default(),
        };

        config.apply_overrides(
            std::env::var(DB_ENV).ok(),
            std::env::var(COVER_SERVICE_ENV).ok(),
        );
        Ok(config)
    }

    fn apply_overrides(&mut self, db_path: Option<String>, cover_service_url: Option<String>) {
        if let Some(path) = db_path.filter(|p| !p.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = cover_service_url.filter(|u| !u.is_empty()) {
            self.cover_service_url = url;
        }
        self.cover_service_url = self.cover_service_url.trim_end_matches('/').to_string();
    }

    /// Catalog location, falling back to the platform data directory
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(Library::default_path)
    }

    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.preview_delay_ms)
    }

    pub fn source_ttl(&self) -> Duration {
        Duration::from_secs(self.source_ttl_secs)
    }

    pub fn cover_timeout(&self) -> Duration {
        Duration::from_secs(self.cover_timeout_secs)
    }
}
