//! Input resolution: metadata tables and sharded record paths.
//!
//! Records are stored one JSON file per map sheet, sharded into directories
//! named after the first character of the record identifier
//! (`a/a1b2c3.json`) so no single directory holds tens of thousands of files.
//! Output files use the same layout unless [`Sharding::Flat`] is requested.

use crate::config::Sharding;
use crate::error::{GeorefError, RecordError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One row of the metadata table.
///
/// The conversion reads `georef_id` (historically `georef_klokan`) and
/// `image_uri`; the checker reads `manifest_url` and `image_uri`. Other
/// columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    #[serde(alias = "georef_klokan", default)]
    pub georef_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image_uri: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub manifest_url: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Read every row of a CSV metadata table with a header line.
pub fn read_metadata(path: &Path) -> Result<Vec<MetadataRow>, GeorefError> {
    if !path.is_file() {
        return Err(GeorefError::MetadataNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| GeorefError::MetadataInvalid {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<MetadataRow>, _>>()
        .map_err(|e| GeorefError::MetadataInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    info!("Read {} metadata rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Path of the JSON file for record `id` under `root`.
pub fn record_path(root: &Path, id: &str, sharding: Sharding) -> Result<PathBuf, RecordError> {
    let id = id.trim();
    let first = id.chars().next().ok_or_else(|| RecordError::InvalidIdentifier {
        id: id.to_string(),
    })?;
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(RecordError::InvalidIdentifier { id: id.to_string() });
    }

    let file = format!("{id}.json");
    let path = match sharding {
        Sharding::ByFirstChar => root.join(first.to_string()).join(file),
        Sharding::Flat => root.join(file),
    };
    debug!("Record {} → {}", id, path.display());
    Ok(path)
}
