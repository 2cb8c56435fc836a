//! Data directory layout and persisted UI settings.
//!
//! Settings live in `settings.json` next to the database and are always
//! read and written as a whole. A missing or unreadable file yields the
//! defaults; keys this build doesn't know about are carried through untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::DB_FILE_NAME;
use crate::error::Result;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

const DATA_DIR_NAME: &str = "student-records";

pub const LIGHT_THEME: &str = "flatly";
pub const DARK_THEME: &str = "darkly";

/// Files belonging to one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Explicit directory if given, otherwise the platform data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let dir = explicit.unwrap_or_else(default_data_dir);
        Self::new(dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    pub geometry: String,
    pub zoomed: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: LIGHT_THEME.to_string(),
            geometry: "1024x640".to_string(),
            zoomed: false,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn is_dark(&self) -> bool {
        self.theme == DARK_THEME
    }

    /// Switch between the light and dark theme; returns the new theme name.
    pub fn toggle_theme(&mut self) -> &str {
        self.theme = if self.is_dark() {
            LIGHT_THEME.to_string()
        } else {
            DARK_THEME.to_string()
        };
        &self.theme
    }

    /// Window size from `geometry`, falling back to the default size.
    pub fn window_size(&self) -> (f32, f32) {
        parse_geometry(&self.geometry).unwrap_or((1024.0, 640.0))
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.geometry = format!("{}x{}", width.round() as i64, height.round() as i64);
    }
}

/// Parse `WxH` or `WxH+X+Y` into a size.
pub fn parse_geometry(text: &str) -> Option<(f32, f32)> {
    let size = text.trim().split(['+', '-']).next()?;
    let (w, h) = size.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w as f32, h as f32))
}

pub fn load_settings(path: &Path) -> Settings {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings");
            }
            return Settings::default();
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "settings file is not valid JSON");
            return Settings::default();
        }
    };
    let serde_json::Value::Object(map) = value else {
        tracing::warn!(path = %path.display(), "settings file is not a JSON object");
        return Settings::default();
    };
    overlay_settings(map, path)
}

/// Defaults overlaid key by key. A known key with the wrong type keeps its
/// default; unknown keys go to `extra`.
fn overlay_settings(map: serde_json::Map<String, serde_json::Value>, path: &Path) -> Settings {
    let mut settings = Settings::default();
    for (key, value) in map {
        match (key.as_str(), &value) {
            ("theme", serde_json::Value::String(t)) => settings.theme = t.clone(),
            ("geometry", serde_json::Value::String(g)) => settings.geometry = g.clone(),
            ("zoomed", serde_json::Value::Bool(z)) => settings.zoomed = *z,
            ("theme" | "geometry" | "zoomed", _) => {
                tracing::warn!(path = %path.display(), key = %key, value = %value, "ignoring mistyped setting");
            }
            _ => {
                settings.extra.insert(key, value);
            }
        }
    }
    settings
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Save, logging failures instead of returning them.
pub fn save_settings_best_effort(path: &Path, settings: &Settings) {
    if let Err(e) = save_settings(path, settings) {
        tracing::warn!(path = %path.display(), error = %e, "failed to save settings");
    }
}
