//! Mirror configuration, loaded from RON.
//!
//! ```ron
//! (
//!     debounce_ms: 200,
//!     auto_run: true,
//!     float_offset: 24,
//! )
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading a mirror config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Auto-run delay after the last qualifying execution elsewhere.
    pub debounce_ms: u64,
    /// Initial state of the auto-run toggle on new mirrors.
    pub auto_run: bool,
    /// Pixels each floating stacking step shifts a window, on both axes.
    pub float_offset: u32,
    /// Upper bound on watcher re-delivery rounds per settle.
    pub max_observer_passes: usize,
    /// Flow bus channel capacity for hosts built from this config.
    pub event_capacity: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            auto_run: false,
            float_offset: 24,
            max_observer_passes: 8,
            event_capacity: 256,
        }
    }
}

impl MirrorConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
