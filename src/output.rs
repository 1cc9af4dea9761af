//! Result types returned by the batch entry points.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of converting one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    /// Identifier from the metadata table.
    pub georef_id: String,
    /// Where the record was read from, when the identifier was usable.
    pub input_path: Option<PathBuf>,
    /// Where the converted document was written; `None` on failure.
    pub output_path: Option<PathBuf>,
    /// Number of ground control points carried over.
    pub gcp_count: usize,
    pub duration_ms: u64,
    /// `Some` when this record failed; the batch carried on regardless.
    pub error: Option<RecordError>,
}

impl RecordResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for a conversion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_records: usize,
    pub converted: usize,
    pub failed: usize,
    pub total_gcps: usize,
    pub total_duration_ms: u64,
}

/// Everything a conversion batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub records: Vec<RecordResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Failed records, in metadata order.
    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.records.iter().filter(|r| !r.is_success())
    }
}

/// Aggregate counters for a reachability check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub total_rows: usize,
    /// Rows whose manifest answered 200 and parsed as a manifest.
    pub manifests_ok: usize,
    /// Rows whose image request answered 200.
    pub images_ok: usize,
    /// Rows carrying a transport or manifest error.
    pub errors: usize,
    pub total_duration_ms: u64,
}
