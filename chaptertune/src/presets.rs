//! Saved run inputs
//!
//! A preset is a [`RunInputs`] record stored as pretty JSON at
//! `<data_dir>/presets/<name>.json`. Names are limited to ASCII letters,
//! digits, `_` and `-` so they cannot leave the presets directory.

use crate::models::RunInputs;
use chaptertune_common::config::data_dir;
use chaptertune_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PRESET_EXTENSION: &str = "json";

/// Directory-backed preset storage
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory
    pub fn default_location() -> Self {
        Self::new(data_dir().join("presets"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a preset, replacing any existing one with the same name
    pub fn save(&self, name: &str, inputs: &RunInputs) -> Result<PathBuf> {
        validate_name(name)?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(inputs)
            .map_err(|e| Error::Internal(format!("Serialize preset failed: {}", e)))?;
        std::fs::write(&path, json)?;

        info!(preset = name, path = %path.display(), "Saved preset");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<RunInputs> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::NotFound(format!("preset '{}'", name)));
        }

        let content = std::fs::read_to_string(&path)?;
        let inputs = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("Preset '{}' is not valid: {}", name, e)))?;

        debug!(preset = name, "Loaded preset");
        Ok(inputs)
    }

    /// Sorted preset names; empty when the directory does not exist yet
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PRESET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, PRESET_EXTENSION))
    }
}

/// Accept `[A-Za-z0-9_-]+`
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "invalid preset name '{}': use letters, digits, '_' or '-'",
            name
        )))
    }
}
