//! Eyewear frame catalog.
//!
//! Frames with known physical dimensions serve as calibration references.
//! The catalog is a flat list of entries keyed by product code; a
//! [`FrameStore`] persists it. [`YamlFrameStore`] keeps it in a YAML file.

use crate::{calibration::ReferenceFrame, Error, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One catalog document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// Product code, unique within the catalog
    pub code: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Color description
    #[serde(default)]
    pub color: String,
    /// Total frame width in millimeters
    pub width_mm: f64,
    /// Bridge width in millimeters, 0 when unknown
    #[serde(default)]
    pub bridge_mm: f64,
    /// Lens height in millimeters, 0 when unknown
    #[serde(default)]
    pub lens_height_mm: f64,
}

impl FrameEntry {
    /// Check the minimum an entry needs: a code and a positive width
    ///
    /// # Errors
    ///
    /// Returns [`Error::Catalog`] describing the missing field
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(Error::Catalog("Frame code is required".to_string()));
        }
        if !self.width_mm.is_finite() || self.width_mm <= 0.0 {
            return Err(Error::Catalog(format!(
                "Frame {} needs a positive width, got {}",
                self.code, self.width_mm
            )));
        }
        Ok(())
    }

    /// Calibration reference built from this entry
    ///
    /// # Errors
    ///
    /// Returns an error if the width is not positive
    pub fn reference_frame(&self) -> Result<ReferenceFrame> {
        ReferenceFrame::new(self.width_mm, Some(self.bridge_mm), Some(self.lens_height_mm))
    }

    /// `name (code)` label for selection lists
    #[must_use]
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.code.clone()
        } else {
            format!("{} ({})", self.name, self.code)
        }
    }
}

/// In-memory list of frame entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameCatalog {
    #[serde(default)]
    frames: Vec<FrameEntry>,
}

impl FrameCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[FrameEntry] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Find an entry by code
    #[must_use]
    pub fn find(&self, code: &str) -> Option<&FrameEntry> {
        self.frames.iter().find(|f| f.code == code)
    }

    /// Add a validated entry
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is invalid or the code already exists
    pub fn add(&mut self, entry: FrameEntry) -> Result<()> {
        entry.validate()?;
        if self.find(&entry.code).is_some() {
            return Err(Error::Catalog(format!("Frame {} already exists", entry.code)));
        }
        self.frames.push(entry);
        Ok(())
    }

    /// Reference for the entry with `code`
    ///
    /// # Errors
    ///
    /// Returns an error if no such entry exists or its width is invalid
    pub fn select(&self, code: &str) -> Result<ReferenceFrame> {
        self.find(code)
            .ok_or_else(|| Error::Catalog(format!("Unknown frame: {code}")))?
            .reference_frame()
    }
}

/// Persistence of the frame catalog
pub trait FrameStore {
    /// Read every entry
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read
    fn list(&self) -> Result<FrameCatalog>;

    /// Add one entry and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is rejected or cannot be stored
    fn add(&mut self, entry: FrameEntry) -> Result<()>;
}

/// Catalog stored as a YAML file
#[derive(Debug, Clone)]
pub struct YamlFrameStore {
    path: PathBuf,
}

impl YamlFrameStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn save(&self, catalog: &FrameCatalog) -> Result<()> {
        let content = serde_yaml::to_string(catalog)
            .map_err(|e| Error::Catalog(format!("Failed to serialize catalog: {e}")))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl FrameStore for YamlFrameStore {
    fn list(&self) -> Result<FrameCatalog> {
        if !self.path.exists() {
            return Ok(FrameCatalog::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let catalog: FrameCatalog = serde_yaml::from_str(&content)
            .map_err(|e| Error::Catalog(format!("Failed to parse {}: {e}", self.path.display())))?;
        Ok(catalog)
    }

    fn add(&mut self, entry: FrameEntry) -> Result<()> {
        let mut catalog = self.list()?;
        let code = entry.code.clone();
        catalog.add(entry)?;
        self.save(&catalog)?;
        info!("Added frame {code} to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, width: f64) -> FrameEntry {
        FrameEntry {
            code: code.to_string(),
            name: "Aviator".to_string(),
            color: "gold".to_string(),
            width_mm: width,
            bridge_mm: 14.0,
            lens_height_mm: 0.0,
        }
    }

    #[test]
    fn test_add_and_select() {
        let mut catalog = FrameCatalog::new();
        catalog.add(entry("AV-01", 140.0)).unwrap();

        let reference = catalog.select("AV-01").unwrap();
        assert_eq!(reference.width_mm(), 140.0);
        assert_eq!(reference.bridge_mm(), Some(14.0));
        assert_eq!(reference.lens_height_mm(), None);
        assert!(catalog.select("missing").is_err());
    }

    #[test]
    fn test_add_rejects_invalid_entries() {
        let mut catalog = FrameCatalog::new();
        assert!(catalog.add(entry("", 140.0)).is_err());
        assert!(catalog.add(entry("AV-02", 0.0)).is_err());
        catalog.add(entry("AV-02", 138.0)).unwrap();
        assert!(catalog.add(entry("AV-02", 141.0)).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_label() {
        assert_eq!(entry("AV-01", 140.0).label(), "Aviator (AV-01)");
        let mut bare = entry("X", 140.0);
        bare.name.clear();
        assert_eq!(bare.label(), "X");
    }

    #[test]
    fn test_yaml_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = YamlFrameStore::new(dir.path().join("frames.yaml"));
        assert!(store.list().unwrap().is_empty());

        store.add(entry("AV-01", 140.0)).unwrap();
        store.add(entry("RB-07", 145.5)).unwrap();

        let catalog = store.list().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find("RB-07").unwrap().width_mm, 145.5);
    }

    #[test]
    fn test_missing_optional_fields_parse() {
        let yaml = "frames:\n  - code: M1\n    width_mm: 139.0\n";
        let catalog: FrameCatalog = serde_yaml::from_str(yaml).unwrap();
        let reference = catalog.select("M1").unwrap();
        assert_eq!(reference.bridge_mm(), None);
    }
}
