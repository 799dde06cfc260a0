//! Runtime configuration. Reads a `weft.toml` file with a `[runtime]`
//! section and falls back to defaults when it is missing or broken.

use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};
use weft_types::BuildMode;

/// Names render code may read without being defined on the instance.
const DEFAULT_ALLOWED_GLOBALS: &[&str] = &[
    "Infinity", "undefined", "NaN", "isFinite", "isNaN", "parseFloat", "parseInt", "Math",
    "Number", "Date", "Array", "Object", "Boolean", "String", "RegExp", "Map", "Set", "JSON",
];

fn default_allowed_globals() -> BTreeSet<String> {
    DEFAULT_ALLOWED_GLOBALS.iter().map(|s| (*s).to_string()).collect()
}

/// Settings fixed for the lifetime of a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    #[serde(default)]
    pub build_mode: BuildMode,
    /// Enables construction timing in development builds.
    #[serde(default)]
    pub performance: bool,
    #[serde(default = "default_allowed_globals")]
    pub allowed_globals: BTreeSet<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::default(),
            performance: false,
            allowed_globals: default_allowed_globals(),
        }
    }
}

/// Raw TOML structure matching the `weft.toml` format.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    runtime: RuntimeConfig,
}

impl RuntimeConfig {
    #[must_use]
    pub fn development() -> Self {
        Self {
            build_mode: BuildMode::Development,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn production() -> Self {
        Self {
            build_mode: BuildMode::Production,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_performance(mut self, enabled: bool) -> Self {
        self.performance = enabled;
        self
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        self.build_mode.is_development()
    }

    /// Parses a config document.
    pub fn from_toml_str(contents: &str) -> RuntimeResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.runtime)
    }

    /// Loads config from `path`. A missing file yields the defaults; an
    /// unreadable or invalid file yields the defaults with a warning.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No runtime config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!(build_mode = %config.build_mode, "Loaded runtime config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse runtime config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read runtime config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
