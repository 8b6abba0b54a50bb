// src/config.rs

//! Display descriptors and emulator options.
//!
//! A display descriptor is the static, per-model description of a panel
//! (its size and default colors), stored as one JSON file per model in the
//! config directory, e.g. `config/epd2in13.json`:
//!
//! ```json
//! { "name": "epd2in13", "width": 122, "height": 250,
//!   "color": "white", "text_color": "black" }
//! ```
//!
//! Missing fields fall back to the defaults of the 2.13" panel. A missing
//! file is an error, never defaulted.
//!
//! `EmulatorOptions` carries the per-run choices (which model, which backend,
//! color or binary, refresh interval, ...).

use crate::color::Color;
use crate::error::{EpdError, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the directory descriptors are read from.
pub const CONFIG_DIR_ENV: &str = "EPD_EMULATOR_CONFIG_DIR";

/// Directory holding the descriptor files: `$EPD_EMULATOR_CONFIG_DIR` when
/// set, otherwise the `config/` directory shipped with the crate.
pub static DEFAULT_CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var_os(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("config"))
});

// --- Display Descriptor ---

/// Static description of one display model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayDescriptor {
    /// Model identifier; expected to match the descriptor's file stem.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Background color a fresh frame is filled with.
    pub color: Color,
    /// Default color for text and outlines.
    pub text_color: Color,
}

impl Default for DisplayDescriptor {
    fn default() -> Self {
        DisplayDescriptor {
            name: String::new(),
            width: 122,
            height: 250,
            color: Color::Rgb(255, 255, 255),
            text_color: Color::Rgb(0, 0, 0),
        }
    }
}

impl DisplayDescriptor {
    /// Loads the descriptor of `model` from `<config_dir>/<model>.json`.
    pub fn load(model: &str, config_dir: &Path) -> Result<Self> {
        Self::from_path(&config_dir.join(format!("{}.json", model)))
    }

    /// Loads a descriptor from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| EpdError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut descriptor: DisplayDescriptor =
            serde_json::from_str(&content).map_err(|source| EpdError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(EpdError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!(
                    "dimensions must be positive, got {}x{}",
                    descriptor.width, descriptor.height
                ),
            });
        }

        // The name is advisory: fill it in when absent, warn when it disagrees.
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if descriptor.name.is_empty() {
            descriptor.name = stem;
        } else if descriptor.name != stem {
            warn!(
                "Descriptor {} is named '{}', which does not match its file name",
                path.display(),
                descriptor.name
            );
        }

        debug!(
            "Loaded descriptor '{}' ({}x{}) from {}",
            descriptor.name,
            descriptor.width,
            descriptor.height,
            path.display()
        );
        Ok(descriptor)
    }

    /// The same display turned by 90 degrees.
    pub fn rotated(self) -> Self {
        DisplayDescriptor {
            width: self.height,
            height: self.width,
            ..self
        }
    }
}

/// Lists the model identifiers available in `config_dir`, sorted.
pub fn available_models(config_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(config_dir).map_err(|source| EpdError::ConfigRead {
        path: config_dir.to_path_buf(),
        source,
    })?;

    let mut models = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| EpdError::ConfigRead {
                path: config_dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem() {
                models.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    models.sort();
    Ok(models)
}

// --- Emulator Options ---

/// Which display backend renders the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A desktop window repainted on a timer.
    Window,
    /// A local web page polling a PNG of the frame.
    #[default]
    Http,
    /// No output at all; publishes are only counted.
    Headless,
}

/// Per-run configuration of an emulator instance.
#[derive(Debug, Clone)]
pub struct EmulatorOptions {
    /// Descriptor to load, by model identifier.
    pub config_file: String,
    pub backend: BackendKind,
    /// RGB frame when true, binary (black/white) frame otherwise.
    pub use_color: bool,
    /// Period of the background refresh and of the browser's reload.
    pub update_interval: Duration,
    /// Swap width and height (landscape use of a portrait panel).
    pub reverse_orientation: bool,
    /// HTTP listener port. 0 picks a free port.
    pub port: u16,
    /// Open the page in the default browser shortly after startup.
    pub open_browser: bool,
    /// Integer window scale; 1, 2 and 4 are supported.
    pub window_scale: u8,
    /// Overrides `DEFAULT_CONFIG_DIR`.
    pub config_dir: Option<PathBuf>,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        EmulatorOptions {
            config_file: "epd2in13".to_string(),
            backend: BackendKind::Http,
            use_color: false,
            update_interval: Duration::from_secs(2),
            reverse_orientation: false,
            port: 5000,
            open_browser: true,
            window_scale: 1,
            config_dir: None,
        }
    }
}

impl EmulatorOptions {
    pub fn config_dir(&self) -> &Path {
        self.config_dir
            .as_deref()
            .unwrap_or_else(|| DEFAULT_CONFIG_DIR.as_path())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            return Err(EpdError::InvalidOption(
                "update_interval must be greater than zero".to_string(),
            ));
        }
        if !matches!(self.window_scale, 1 | 2 | 4) {
            return Err(EpdError::InvalidOption(format!(
                "window_scale must be 1, 2 or 4, got {}",
                self.window_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bundled_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    /// Writes `content` to a fresh file named `<stem>.json` in a scratch directory.
    fn scratch_descriptor(stem: &str, content: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "epd-emulator-config-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.json", stem));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn bundled_config_files_exist() {
        let models = available_models(&bundled_dir()).unwrap();
        assert!(!models.is_empty(), "No config files found");
        assert!(models.contains(&"epd2in13".to_string()));
        assert!(models.contains(&"epd7in5".to_string()));
    }

    #[test_log::test]
    fn bundled_config_files_are_complete_and_consistent() {
        let required = ["name", "width", "height", "color", "text_color"];
        for model in available_models(&bundled_dir()).unwrap() {
            let path = bundled_dir().join(format!("{}.json", model));
            let raw: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            for key in required {
                assert!(raw.get(key).is_some(), "{} is missing '{}'", model, key);
            }

            let descriptor = DisplayDescriptor::load(&model, &bundled_dir()).unwrap();
            assert!(descriptor.width > 0, "{}: width must be positive", model);
            assert!(descriptor.height > 0, "{}: height must be positive", model);
            assert_eq!(descriptor.name, model, "name doesn't match filename");
        }
    }

    #[test]
    fn loads_known_dimensions() {
        let d = DisplayDescriptor::load("epd7in5", &bundled_dir()).unwrap();
        assert_eq!((d.width, d.height), (800, 480));
        let d = DisplayDescriptor::load("epd2in13", &bundled_dir()).unwrap();
        assert_eq!((d.width, d.height), (122, 250));
    }

    #[test]
    fn absent_fields_take_documented_defaults() {
        let path = scratch_descriptor("bare", "{}");
        let d = DisplayDescriptor::from_path(&path).unwrap();
        assert_eq!(d.name, "bare");
        assert_eq!((d.width, d.height), (122, 250));
        assert_eq!(d.color, Color::Rgb(255, 255, 255));
        assert_eq!(d.text_color, Color::Rgb(0, 0, 0));
    }

    #[test]
    fn missing_file_is_not_defaulted() {
        let err = DisplayDescriptor::load("no_such_panel", &bundled_dir()).unwrap_err();
        assert!(matches!(err, EpdError::ConfigRead { .. }), "got {:?}", err);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let path = scratch_descriptor("broken", "{ \"width\": 10, ");
        let err = DisplayDescriptor::from_path(&path).unwrap_err();
        assert!(matches!(err, EpdError::ConfigParse { .. }), "got {:?}", err);

        let path = scratch_descriptor("wrongtype", r#"{ "width": "wide" }"#);
        assert!(matches!(
            DisplayDescriptor::from_path(&path),
            Err(EpdError::ConfigParse { .. })
        ));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let path = scratch_descriptor("flat", r#"{ "width": 0, "height": 10 }"#);
        assert!(matches!(
            DisplayDescriptor::from_path(&path),
            Err(EpdError::ConfigInvalid { .. })
        ));
    }

    #[test_log::test]
    fn mismatched_name_is_kept_as_written() {
        let path = scratch_descriptor("panel_a", r#"{ "name": "panel_b" }"#);
        let d = DisplayDescriptor::from_path(&path).unwrap();
        assert_eq!(d.name, "panel_b");
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let d = DisplayDescriptor::default().rotated();
        assert_eq!((d.width, d.height), (250, 122));
    }

    #[test]
    fn options_reject_zero_interval_and_odd_scale() {
        let options = EmulatorOptions {
            update_interval: Duration::ZERO,
            ..EmulatorOptions::default()
        };
        assert!(matches!(options.validate(), Err(EpdError::InvalidOption(_))));

        let options = EmulatorOptions {
            window_scale: 3,
            ..EmulatorOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(EmulatorOptions::default().validate().is_ok());
    }
}
