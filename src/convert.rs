//! Batch conversion entry points.
//!
//! Reads one Klokan record per metadata row, transforms it and writes one
//! JSON document per record. Records are processed one at a time, in
//! metadata order. A record that fails (missing file, missing key) is recorded
//! in its [`RecordResult`] and the batch moves on; only run-level problems
//! such as an uncreatable output directory abort with a [`GeorefError`].

use crate::config::{ConvertConfig, OutputFormat, Sharding};
use crate::error::{GeorefError, RecordError};
use crate::input::{read_metadata, record_path, MetadataRow};
use crate::output::{BatchOutput, BatchStats, RecordResult};
use crate::record::KlokanRecord;
use crate::transform::{to_allmaps, transform, TransformOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every record listed in a CSV metadata table.
///
/// # Errors
/// Returns `Err(GeorefError)` only for fatal errors:
/// - metadata table missing or malformed
/// - output directory cannot be created
/// - every record failed
pub async fn convert_from_metadata(
    metadata_path: impl AsRef<Path>,
    config: &ConvertConfig,
) -> Result<BatchOutput, GeorefError> {
    let rows = read_metadata(metadata_path.as_ref())?;
    convert_batch(&rows, config).await
}

/// Convert the records named by `rows`.
///
/// # Returns
/// `Ok(BatchOutput)` as long as at least one record converted (or `rows` is
/// empty); check `output.stats.failed` for partial failure.
pub async fn convert_batch(
    rows: &[MetadataRow],
    config: &ConvertConfig,
) -> Result<BatchOutput, GeorefError> {
    let batch_start = Instant::now();

    if !config.output_dir.exists() {
        info!("Creating {}", config.output_dir.display());
    }
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| GeorefError::OutputDirFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let total = rows.len();
    info!("Converting {} records into {}", total, config.output_dir.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut records = Vec::with_capacity(total);
    for (i, row) in rows.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_start(index, total, &row.georef_id);
        }

        let result = convert_record(&row.georef_id, row.image_uri.as_deref(), config).await;

        match &result.error {
            None => {
                debug!("Converted {} ({} GCPs)", row.georef_id, result.gcp_count);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_complete(index, total, &row.georef_id);
                }
            }
            Some(e) => {
                warn!("Record {} failed: {}", row.georef_id, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(index, total, &row.georef_id, &e.to_string());
                }
            }
        }
        records.push(result);
    }

    let converted = records.iter().filter(|r| r.is_success()).count();
    let stats = BatchStats {
        total_records: total,
        converted,
        failed: total - converted,
        total_gcps: records.iter().map(|r| r.gcp_count).sum(),
        total_duration_ms: batch_start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, converted);
    }

    if total > 0 && converted == 0 {
        let first_error = records
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(GeorefError::AllRecordsFailed { total, first_error });
    }

    info!(
        "Conversion complete: {}/{} records, {}ms total",
        converted, total, stats.total_duration_ms
    );

    Ok(BatchOutput { records, stats })
}

/// Convert a single record and write it to the output tree.
///
/// # Arguments
/// * `georef_id`: record identifier; selects `<input_dir>/<c>/<id>.json`
/// * `image_uri`: IIIF Image API base URI; `None` fails the record with
///   `MissingField("image_uri")`
/// * `config`: output root, format, pixel key and sharding
///
/// # Returns
/// Always a `RecordResult`. Failures land in `result.error` rather than being
/// propagated, so one bad record never aborts a batch. On failure
/// `output_path` is `None` and nothing is left at the target path.
pub async fn convert_record(
    georef_id: &str,
    image_uri: Option<&str>,
    config: &ConvertConfig,
) -> RecordResult {
    let start = Instant::now();
    let mut result = RecordResult {
        georef_id: georef_id.to_string(),
        input_path: None,
        output_path: None,
        gcp_count: 0,
        duration_ms: 0,
        error: None,
    };

    if let Err(e) = try_convert(georef_id, image_uri, config, &mut result).await {
        result.output_path = None;
        result.error = Some(e);
    }
    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

/// Synchronous wrapper around [`convert_from_metadata`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    metadata_path: impl AsRef<Path>,
    config: &ConvertConfig,
) -> Result<BatchOutput, GeorefError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GeorefError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_from_metadata(metadata_path, config))
}

/// Load a record from disk, attaching the path to any error.
pub async fn load_record(path: &Path) -> Result<KlokanRecord, RecordError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RecordError::InputUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| RecordError::InvalidJson {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    KlokanRecord::from_value(value)
}

/// Serialise the configured output document for one record.
pub fn render_document(
    record: &KlokanRecord,
    georef_id: &str,
    image_uri: &str,
    config: &ConvertConfig,
) -> Result<Vec<u8>, RecordError> {
    let encoded = match config.format {
        OutputFormat::IiifAnnotation => {
            let options = TransformOptions {
                pixel_property: config.pixel_property,
            };
            let page = transform(record, georef_id, image_uri, &config.base_uri, &options);
            serde_json::to_vec_pretty(&page)
        }
        OutputFormat::Allmaps => serde_json::to_vec_pretty(&to_allmaps(record, georef_id, image_uri)),
    };
    let mut bytes = encoded.map_err(|e| RecordError::InvalidRecord {
        detail: format!("serialisation failed: {e}"),
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn try_convert(
    georef_id: &str,
    image_uri: Option<&str>,
    config: &ConvertConfig,
    result: &mut RecordResult,
) -> Result<(), RecordError> {
    // Input records are always sharded; only the output layout is configurable.
    let input_path = record_path(&config.input_dir, georef_id, Sharding::ByFirstChar)?;
    result.input_path = Some(input_path.clone());

    let image_uri = image_uri.ok_or_else(|| RecordError::missing("image_uri"))?;

    debug!("Opening {}", input_path.display());
    let record = load_record(&input_path).await?;
    result.gcp_count = record.ground_control_points.len();

    let bytes = render_document(&record, georef_id.trim(), image_uri, config)?;
    let output_path = record_path(&config.output_dir, georef_id, config.sharding)?;
    write_atomic(&output_path, &bytes).await?;

    result.output_path = Some(output_path);
    Ok(())
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RecordError> {
    let fail = |e: std::io::Error| RecordError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }
    let tmp_path: PathBuf = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(dir: &Path) -> ConvertConfig {
        ConvertConfig::builder()
            .input_dir(dir.join("in"))
            .output_dir(dir.join("out"))
            .base_uri("https://example.org/georef")
            .build()
            .unwrap()
    }

    fn write_record(dir: &Path, id: &str) {
        let path = dir.join("in").join(&id[..1]).join(format!("{id}.json"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let record = json!({
            "new_cutlines": [[0, 0], [100, 0], [100, 50], [0, 0]],
            "new_gcps": [{"pixel": [10, 10], "location": [4.48, 52.15]}],
            "map": {"image": {"width": 100, "height": 50}}
        });
        std::fs::write(path, serde_json::to_vec(&record).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn converts_single_record() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "abc");
        let config = config(dir.path());

        let result = convert_record("abc", Some("https://img.example.org/abc"), &config).await;
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.gcp_count, 1);

        let out = result.output_path.unwrap();
        assert_eq!(out, dir.path().join("out/a/abc.json"));
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(written["id"], "https://example.org/georef/abc");
        assert!(!out.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_image_uri_is_record_error() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "abc");
        let result = convert_record("abc", None, &config(dir.path())).await;
        assert!(matches!(
            result.error,
            Some(RecordError::MissingField { ref field }) if field == "image_uri"
        ));
        assert!(result.output_path.is_none());
    }

    #[tokio::test]
    async fn missing_input_file_is_record_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_record("zzz", Some("https://img/x"), &config(dir.path())).await;
        assert!(matches!(result.error, Some(RecordError::InputUnreadable { .. })));
        assert_eq!(result.input_path, Some(dir.path().join("in/z/zzz.json")));
    }

    #[tokio::test]
    async fn invalid_json_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in/b/bad.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ truncated").unwrap();

        let result = convert_record("bad", Some("https://img/x"), &config(dir.path())).await;
        match result.error {
            Some(RecordError::InvalidJson { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn render_allmaps_document() {
        let record = KlokanRecord::from_value(json!({
            "new_cutlines": [[0, 0], [1, 0], [0, 0]],
            "new_gcps": [{"pixel": [1, 1], "location": [5.0, 52.0]}],
            "map": {"image": {"width": 2, "height": 2}}
        }))
        .unwrap();
        let config = ConvertConfig::builder()
            .format(OutputFormat::Allmaps)
            .build()
            .unwrap();
        let bytes = render_document(&record, "r1", "https://img/r1", &config).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["pixelMask"], json!([[0, 0], [1, 0]]));
        assert_eq!(value["image"]["uri"], "https://img/r1");
    }
}
