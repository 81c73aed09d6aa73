//! Station catalog: content reference → human description.
//!
//! Loaded from a YAML mapping, for example:
//!
//! ```yaml
//! A:
//!   name: Anatomy
//!   location: Building 2, room 114
//!   description: Bring your gloves.
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::table::RouteTable;

/// Human-readable details of one station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StationInfo {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Where to go.
    #[serde(default)]
    pub location: String,
    /// Free-form instructions.
    #[serde(default)]
    pub description: String,
}

/// Station details keyed by upper-cased content reference.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: BTreeMap<String, StationInfo>,
}

impl StationCatalog {
    /// Parses a YAML catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the YAML is malformed.
    pub fn from_yaml(source: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, StationInfo> = serde_yaml::from_str(source)?;
        let stations = raw
            .into_iter()
            .map(|(id, info)| (id.trim().to_uppercase(), info))
            .collect();
        Ok(Self { stations })
    }

    /// Reads and parses a YAML catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read and
    /// `CatalogError::Parse` if it is malformed.
    pub fn load_file(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    /// Details for a content reference.
    #[must_use]
    pub fn get(&self, content: &str) -> Option<&StationInfo> {
        self.stations.get(content)
    }

    /// Number of catalogued stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Content references used by `table` that have no catalog entry.
    #[must_use]
    pub fn missing_from(&self, table: &RouteTable) -> Vec<String> {
        table
            .distinct_stations()
            .into_iter()
            .filter(|content| !self.stations.contains_key(content))
            .collect()
    }
}
