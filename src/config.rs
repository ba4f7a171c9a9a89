use crate::bridge::{AFFIRMATIVE_BURST, PRIMARY_BURST};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest burst a config may ask for
pub const MAX_BURST: usize = 500;

/// Longest countdown a config may ask for (one year)
pub const MAX_COUNTDOWN_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Disables all confetti
    pub reduced_motion: bool,
    /// Let the track start without a prior key press or click
    pub allow_autoplay: bool,
    pub track_title: String,
    /// Track length in seconds, 0 when unknown
    pub track_seconds: f64,
    /// Seconds until the countdown reaches zero
    pub countdown_seconds: u64,
    /// Envelope burst size
    pub primary_burst: usize,
    /// "Yes" button burst size
    pub affirmative_burst: usize,
}

impl AppConfig {
    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Clamp values that came from a file or the command line
    pub fn sanitized(mut self) -> Self {
        self.primary_burst = self.primary_burst.clamp(1, MAX_BURST);
        self.affirmative_burst = self.affirmative_burst.clamp(1, MAX_BURST);
        self.countdown_seconds = self.countdown_seconds.min(MAX_COUNTDOWN_SECONDS);
        if !self.track_seconds.is_finite() || self.track_seconds < 0.0 {
            self.track_seconds = 0.0;
        }
        self
    }

    /// Track duration, `None` when unknown
    pub fn track_duration(&self) -> Option<f64> {
        (self.track_seconds > 0.0).then_some(self.track_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            reduced_motion: false,
            allow_autoplay: false,
            track_title: "Our Song".to_string(),
            track_seconds: 214.0,
            countdown_seconds: 3 * 60,
            primary_burst: PRIMARY_BURST,
            affirmative_burst: AFFIRMATIVE_BURST,
        }
    }
}
