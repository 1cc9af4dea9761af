//! Error types for the georef-iiif library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`GeorefError`]: **Fatal**: the run cannot proceed at all (metadata
//!   table missing, output directory not creatable, bad configuration).
//!   Returned as `Err(GeorefError)` from the batch entry points.
//!
//! * [`RecordError`]: **Non-fatal**: a single Klokan record could not be
//!   converted (missing key, unreadable input file). Stored inside
//!   [`crate::output::RecordResult`] so one malformed record never costs the
//!   rest of the batch.
//!
//! * [`CheckError`]: **Non-fatal**: a single reachability check failed
//!   (connection refused, manifest body is not a manifest). Stored on the
//!   [`crate::check::CheckRow`] it belongs to; the checker moves on to the
//!   next pair.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the georef-iiif library.
///
/// Record-level failures use [`RecordError`] and row-level checker failures
/// use [`CheckError`]; neither is propagated here.
#[derive(Debug, Error)]
pub enum GeorefError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The metadata table was not found at the given path.
    #[error("Metadata table not found: '{path}'\nCheck the path exists and is readable.")]
    MetadataNotFound { path: PathBuf },

    /// The metadata table exists but could not be parsed as CSV.
    #[error("Metadata table '{path}' is malformed: {detail}")]
    MetadataInvalid { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not open or write the reachability report.
    #[error("Failed to write report '{path}': {detail}")]
    ReportWriteFailed { path: PathBuf, detail: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every record in the batch failed; nothing was written.
    #[error("All {total} records failed.\nFirst error: {first_error}")]
    AllRecordsFailed { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single Klokan record.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RecordError {
    /// A key the transform requires is absent from the record or metadata row.
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// The record identifier cannot be mapped to a file path.
    #[error("invalid record identifier '{id}'")]
    InvalidIdentifier { id: String },

    /// The input JSON file does not exist or could not be read.
    #[error("cannot read '{path}': {detail}")]
    InputUnreadable { path: PathBuf, detail: String },

    /// The input file is not JSON.
    #[error("invalid JSON in '{path}': {detail}")]
    InvalidJson { path: PathBuf, detail: String },

    /// All keys are present but a value has the wrong shape or type.
    #[error("malformed record: {detail}")]
    InvalidRecord { detail: String },

    /// The converted record could not be written.
    #[error("failed to write '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },
}

impl RecordError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        RecordError::MissingField {
            field: field.into(),
        }
    }
}

/// A non-fatal error for a single reachability check.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CheckError {
    /// The request never produced an HTTP response (DNS, TLS, refused, timeout).
    #[error("request to '{url}' failed: {detail}")]
    Transport { url: String, detail: String },

    /// The manifest answered 200 but its body is not a usable manifest.
    #[error("manifest '{url}' is invalid: {detail}")]
    InvalidManifest { url: String, detail: String },

    /// The metadata row lacks a column the check needs; nothing was requested.
    #[error("missing field '{field}'")]
    MissingField { field: String },
}
