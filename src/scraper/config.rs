use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for launching browser drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Explicit Chrome/Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,

    /// Extra command line switches passed to every browser
    pub chrome_args: Vec<String>,

    /// UI language and Accept-Language; page text parsing expects English
    pub locale: String,

    /// Inclusive range of Chrome major versions used in synthetic user agents
    pub chrome_major_min: u32,
    pub chrome_major_max: u32,

    /// Inclusive viewport ranges in CSS pixels
    pub viewport_width_min: u32,
    pub viewport_width_max: u32,
    pub viewport_height_min: u32,
    pub viewport_height_max: u32,

    /// Run randomized pointer and scroll actions after the first navigation
    pub humanize: bool,

    /// Number of pointer moves in the humanizing sequence (default: 3)
    pub pointer_moves: u32,

    /// Pause between humanizing actions in milliseconds
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,

    /// Polling interval while waiting for a selector (default: 250)
    pub selector_poll_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            chrome_args: Vec::new(),
            locale: "en-US".to_string(),
            chrome_major_min: 118,
            chrome_major_max: 124,
            viewport_width_min: 1200,
            viewport_width_max: 1400,
            viewport_height_min: 700,
            viewport_height_max: 900,
            humanize: true,
            pointer_moves: 3,
            pause_min_ms: 500,
            pause_max_ms: 1500,
            selector_poll_ms: 250,
        }
    }
}

impl DriverConfig {
    pub fn selector_poll(&self) -> Duration {
        Duration::from_millis(self.selector_poll_ms.max(10))
    }

    /// Visible browser for the interactive login flow
    pub fn headed() -> Self {
        Self {
            headless: false,
            ..Default::default()
        }
    }

    /// No humanizing pauses and fast polling
    pub fn fast() -> Self {
        Self {
            humanize: false,
            selector_poll_ms: 100,
            ..Default::default()
        }
    }
}
