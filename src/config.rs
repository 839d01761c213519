//! Configuration for the capture host.
//!
//! Loads settings from config.json at startup. Provides the target window,
//! polling cadence and output options.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::paths;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<CaptureConfig> = OnceLock::new();

/// Complete host configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Title (or part of a title) of the window to capture
    pub window_title: String,
    /// Delay between polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Stop after this many polls. 0 = run until the process is killed
    pub max_polls: u64,
    /// Open the region selector window when a region is missing or reset
    pub interactive_selection: bool,
    /// Force region re-selection on the first poll
    pub reset_roi_on_start: bool,
    /// Write each output frame to `<exe_dir>/frames/<output_file>`
    pub save_frames: bool,
    /// File name for saved frames
    pub output_file: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_title: "Notepad".to_string(),
            poll_interval_ms: 500,
            max_polls: 0,
            interactive_selection: true,
            reset_roi_on_start: false,
            save_frames: true,
            output_file: "latest.png".to_string(),
        }
    }
}

/// Loads configuration from the given path or returns defaults.
pub fn load_config_from(config_path: &Path) -> CaptureConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    CaptureConfig::default()
}

/// Loads config.json from the executable's directory.
fn load_config() -> CaptureConfig {
    load_config_from(&paths::get_config_path())
}

/// Initializes the global configuration. Call once at startup.
///
/// `window_override` replaces the configured window title (first command-line argument).
pub fn init_config(window_override: Option<String>) {
    let mut config = load_config();
    if let Some(title) = window_override.filter(|t| !t.is_empty()) {
        crate::log(&format!("Window title overridden from command line: \"{}\"", title));
        config.window_title = title;
    }
    let _ = CONFIG.set(config);
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static CaptureConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "window_title": "Calculator", "max_polls": 3 }}"#).unwrap();

        let config = load_config_from(file.path());
        assert_eq!(config.window_title, "Calculator");
        assert_eq!(config.max_polls, 3);
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.interactive_selection);
        assert_eq!(config.output_file, "latest.png");
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let config = load_config_from(file.path());
        assert_eq!(config, CaptureConfig::default());
    }
}
