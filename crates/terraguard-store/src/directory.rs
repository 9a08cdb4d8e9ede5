//! Facility directory: a JSON array of [`Facility`] objects.

use std::collections::HashSet;
use std::path::Path;

use terraguard_core::Facility;
use tracing::info;

use crate::StoreError;

/// In-memory facility directory.
///
/// Loaded once from a JSON file (or string) and read-only afterwards. There is
/// no hot reload; callers share it behind an `Arc` when serving concurrently.
#[derive(Debug, Clone, Default)]
pub struct FacilityDirectory {
    facilities: Vec<Facility>,
}

impl FacilityDirectory {
    /// An empty directory. Facility matching against it always yields nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a directory from a JSON file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::DirectoryNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let dir = Self::from_json_str(&raw)?;
        info!(count = dir.len(), path = %path.display(), "loaded facility directory");
        Ok(dir)
    }

    /// Parse a directory from a JSON array string. Facility ids must be unique.
    pub fn from_json_str(raw: &str) -> Result<Self, StoreError> {
        let facilities: Vec<Facility> = serde_json::from_str(raw)?;
        Self::from_facilities(facilities)
    }

    pub fn from_facilities(facilities: Vec<Facility>) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for fac in &facilities {
            if !seen.insert(fac.id.as_str()) {
                return Err(StoreError::DuplicateId(fac.id.clone()));
            }
        }
        Ok(Self { facilities })
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}
