//! Tunable behaviour of the editing engine.
//!
//! Settings persist as a JSON file at an OS-appropriate location. Missing or
//! corrupt files fall back to the defaults rather than failing the session.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Search behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Quiet period after the last keyword change before the scan runs.
    pub debounce_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// The on-screen band inside which a search match counts as visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrollSettings {
    /// Subtracted from a target's offset before comparing against the band.
    pub anchor_offset: f64,
    /// Band start below the current scroll top.
    pub safe_top: f64,
    /// Band end above the viewport bottom.
    pub safe_bottom: f64,
    /// Space left above the target after scrolling.
    pub margin: f64,
    /// Space left above a selected media block scrolled back into view.
    pub media_margin: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            anchor_offset: 80.0,
            safe_top: 40.0,
            safe_bottom: 120.0,
            margin: 100.0,
            media_margin: 10.0,
        }
    }
}

/// Drag-and-drop geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DragSettings {
    /// Vertical gap between an anchor's box and its drop points.
    pub anchor_gap: f64,
    /// Subtracted from the pointer's client y to get a content offset.
    pub pointer_offset: f64,
    /// Auto-scroll up when the pointer is this close to the viewport top.
    pub edge_top: f64,
    /// Auto-scroll down when the pointer is this close to the viewport bottom.
    pub edge_bottom: f64,
    pub scroll_step: f64,
    /// Minimum time between two auto-scroll steps.
    pub scroll_throttle_ms: u64,
    /// Left shift of the drop mark beside non-task list items.
    pub list_indent: f64,
    /// Extra drop mark width beside list items.
    pub list_mark_width: f64,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            anchor_gap: 2.0,
            pointer_offset: 40.0,
            edge_top: 70.0,
            edge_bottom: 30.0,
            scroll_step: 400.0,
            scroll_throttle_ms: 200,
            list_indent: 16.0,
            list_mark_width: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationLogSettings {
    pub keep_last: usize,
}

impl Default for OperationLogSettings {
    fn default() -> Self {
        Self { keep_last: 500 }
    }
}

/// Persisted engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub search: SearchSettings,
    pub scroll: ScrollSettings,
    pub drag: DragSettings,
    pub operation_log: OperationLogSettings,
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/leafnotes/editor.json`
/// - Windows: `%APPDATA%/Leafnotes/editor.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Leafnotes").join("editor.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("leafnotes").join("editor.json")
    }
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> EditorSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring corrupt settings file {}: {e}", path.display());
            EditorSettings::default()
        }),
        Err(_) => EditorSettings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`crate::LeafnotesError::Io`] if the directory or file cannot be
/// written, or [`crate::LeafnotesError::Json`] if serialisation fails.
pub fn save_settings(path: &Path, settings: &EditorSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let s = EditorSettings::default();
        assert_eq!(s.search.debounce_ms, 300);
        assert_eq!(s.drag.scroll_throttle_ms, 200);
        assert_eq!(s.scroll.safe_bottom, 120.0);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let s = load_settings(&dir.path().join("nope.json"));
        assert_eq!(s, EditorSettings::default());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), EditorSettings::default());
    }

    #[test]
    fn test_save_and_reload_with_partial_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("editor.json");
        let mut s = EditorSettings::default();
        s.search.debounce_ms = 120;
        save_settings(&path, &s).unwrap();
        assert_eq!(load_settings(&path), s);

        fs::write(&path, r#"{"drag":{"scrollStep":250}}"#).unwrap();
        let partial = load_settings(&path);
        assert_eq!(partial.drag.scroll_step, 250.0);
        assert_eq!(partial.drag.edge_top, 70.0);
        assert_eq!(partial.search.debounce_ms, 300);
    }

    #[test]
    fn test_settings_path_is_json() {
        assert!(settings_file_path().to_string_lossy().ends_with("editor.json"));
    }
}
