//! # georef-iiif
//!
//! Turn georeferenced map scans into IIIF Georeference Annotations, and check
//! that the IIIF manifests and images they point at are still reachable.
//!
//! ## Why this crate?
//!
//! Georeferencing data for scanned maps often lives in per-map "Klokan"
//! records: a pixel cutline around the map face plus a list of ground control
//! points pairing pixels with longitude/latitude. Viewers that speak the IIIF
//! Georeference extension (Allmaps and friends) want a W3C Web Annotation
//! instead. This crate does the relocation, one JSON file per map, without
//! touching the numbers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! metadata.csv ──┬─ convert ─▶ <input>/<c>/<id>.json ─▶ transform ─▶ <output>/<c>/<id>.json
//!                │
//!                └─ check ───▶ GET manifest ─▶ GET image ─▶ report.csv
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use georef_iiif::{convert_from_metadata, ConvertConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConvertConfig::builder()
//!         .input_dir("klokan")
//!         .output_dir("annotations")
//!         .base_uri("https://maps.example.org/georef")
//!         .build()?;
//!     let output = convert_from_metadata("metadata.csv", &config).await?;
//!     eprintln!(
//!         "{}/{} records converted",
//!         output.stats.converted, output.stats.total_records
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `georef` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! georef-iiif = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotation;
pub mod check;
pub mod config;
pub mod convert;
pub mod error;
pub mod gcp;
pub mod input;
pub mod output;
pub mod progress;
pub mod record;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotation::{AllmapsRecord, AnnotationPage};
pub use check::{
    check_pair, parse_manifest, run_check, CheckPair, CheckRow, Checker, Fetch, FetchResponse,
    ManifestSummary, Report, ReqwestFetcher, REPORT_COLUMNS,
};
pub use config::{
    CheckConfig, CheckConfigBuilder, ConvertConfig, ConvertConfigBuilder, OutputFormat,
    PixelProperty, RateLimit, Sharding, WriteMode,
};
pub use convert::{convert_batch, convert_from_metadata, convert_record, convert_sync};
pub use error::{CheckError, GeorefError, RecordError};
pub use gcp::{naive_fourth_gcp, naive_third_gcp, AxisOrder, Gcp};
pub use input::{read_metadata, record_path, MetadataRow};
pub use output::{BatchOutput, BatchStats, CheckStats, RecordResult};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::KlokanRecord;
pub use transform::{build_selector, to_allmaps, transform, TransformOptions};
