//! Reachability checks for IIIF manifests and their images.
//!
//! For each `(manifest_url, image_uri)` pair the checker:
//!
//! ```text
//! GET manifest ──▶ status 200? ──▶ count canvases ──▶ GET image ──▶ row
//!      │                │
//!      └── error ───────┴── no ───────────────────────────────────▶ row
//! ```
//!
//! Every metadata row yields exactly one [`CheckRow`], whatever went wrong,
//! including rows with no manifest URL. Transport failures and unparseable
//! manifests are recorded on the row and the run carries on. Pairs are checked strictly one after the other with a
//! [`RateLimit`](crate::config::RateLimit) pause in between, as a courtesy to
//! the image server.

pub mod fetch;
pub mod report;

pub use fetch::{Fetch, FetchResponse, ReqwestFetcher};
pub use report::{Report, REPORT_COLUMNS};

use crate::config::CheckConfig;
use crate::error::{CheckError, GeorefError};
use crate::input::{read_metadata, MetadataRow};
use crate::output::CheckStats;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// One manifest to check, with the image it should point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPair {
    /// `None` when the metadata row had no manifest; the row is reported
    /// with a [`CheckError::MissingField`] and nothing is requested.
    pub manifest_url: Option<String>,
    /// `None` skips the image request.
    pub image_uri: Option<String>,
}

impl CheckPair {
    pub fn new(manifest_url: impl Into<String>, image_uri: impl Into<String>) -> Self {
        Self {
            manifest_url: Some(manifest_url.into()),
            image_uri: Some(image_uri.into()),
        }
    }

    /// One pair per metadata row, in table order.
    pub fn from_metadata(rows: &[MetadataRow]) -> Vec<CheckPair> {
        rows.iter()
            .map(|row| CheckPair {
                manifest_url: row.manifest_url.clone(),
                image_uri: row.image_uri.clone(),
            })
            .collect()
    }

    /// Progress label: the manifest URL, or the row position when there is none.
    fn label(&self, index: usize) -> String {
        match &self.manifest_url {
            Some(url) => url.clone(),
            None => format!("row {index} (no manifest_url)"),
        }
    }
}

/// One line of the reachability report.
///
/// Field order is the report's column order. `None` fields serialise as
/// empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRow {
    /// UTC, second precision, `Z` suffix.
    pub datetime: String,
    pub manifest_url: String,
    pub manifest_status: Option<u16>,
    /// Seconds.
    pub manifest_time: Option<f64>,
    pub num_canvases: Option<usize>,
    pub canvas_uri: Option<String>,
    /// Reserved; canvases are never fetched.
    pub canvas_status: Option<u16>,
    pub image_uri: Option<String>,
    pub image_status: Option<u16>,
    /// Seconds.
    pub image_time: Option<f64>,
    /// Why this row is incomplete. Logged, not written to the report.
    #[serde(skip)]
    pub error: Option<CheckError>,
}

impl CheckRow {
    pub fn new(now: DateTime<Utc>, manifest_url: impl Into<String>) -> Self {
        Self {
            datetime: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            manifest_url: manifest_url.into(),
            manifest_status: None,
            manifest_time: None,
            num_canvases: None,
            canvas_uri: None,
            canvas_status: None,
            image_uri: None,
            image_status: None,
            image_time: None,
            error: None,
        }
    }

    /// Manifest answered 200 and parsed, and the image (if checked) answered 200.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
            && self.manifest_status == Some(200)
            && self.image_status.is_none_or(|s| s == 200)
    }

    /// Short human-readable reason for a row that is not [`is_ok`](Self::is_ok).
    pub fn problem(&self) -> Option<String> {
        if let Some(e) = &self.error {
            return Some(e.to_string());
        }
        match (self.manifest_status, self.image_status) {
            (Some(200), Some(200) | None) => None,
            (Some(200), Some(s)) => Some(format!("image HTTP {s}")),
            (Some(s), _) => Some(format!("manifest HTTP {s}")),
            (None, _) => Some("no response".to_string()),
        }
    }
}

/// Canvas information extracted from a manifest body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSummary {
    pub canvas_count: usize,
    pub first_canvas: Option<String>,
}

/// Count the canvases of a IIIF manifest.
///
/// Presentation 2 manifests keep canvases at `sequences[0].canvases`;
/// Presentation 3 manifests keep them at `items`. The version 2 path wins
/// when both exist.
pub fn parse_manifest(url: &str, body: &[u8]) -> Result<ManifestSummary, CheckError> {
    let invalid = |detail: String| CheckError::InvalidManifest {
        url: url.to_string(),
        detail,
    };

    let value: Value = serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;

    let canvases = match value.get("sequences") {
        Some(sequences) => sequences
            .get(0)
            .and_then(|seq| seq.get("canvases"))
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("no canvases at sequences[0].canvases".into()))?,
        None => value
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("neither 'sequences' nor 'items' present".into()))?,
    };

    let first_canvas = canvases.first().and_then(|canvas| {
        canvas
            .get("@id")
            .or_else(|| canvas.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    Ok(ManifestSummary {
        canvas_count: canvases.len(),
        first_canvas,
    })
}

/// Check one pair. Never fails; problems end up on the returned row.
pub async fn check_pair<F: Fetch>(
    fetcher: &F,
    manifest_url: &str,
    image_uri: Option<&str>,
    now: DateTime<Utc>,
) -> CheckRow {
    let mut row = CheckRow::new(now, manifest_url);

    let start = Instant::now();
    let manifest = fetcher.get(manifest_url).await;
    row.manifest_time = Some(start.elapsed().as_secs_f64());

    let response = match manifest {
        Ok(response) => response,
        Err(e) => {
            row.error = Some(e);
            return row;
        }
    };
    row.manifest_status = Some(response.status);
    if response.status != 200 {
        return row;
    }

    match parse_manifest(manifest_url, &response.body) {
        Ok(summary) => {
            row.num_canvases = Some(summary.canvas_count);
            row.canvas_uri = summary.first_canvas;
        }
        Err(e) => row.error = Some(e),
    }

    let Some(image_uri) = image_uri else {
        return row;
    };
    row.image_uri = Some(image_uri.to_string());

    let start = Instant::now();
    let image = fetcher.get(image_uri).await;
    row.image_time = Some(start.elapsed().as_secs_f64());
    match image {
        Ok(response) => row.image_status = Some(response.status),
        Err(e) => {
            row.error.get_or_insert(e);
        }
    }

    row
}

/// Sequential checker over an injected transport.
pub struct Checker<F> {
    fetcher: F,
    config: CheckConfig,
}

impl<F: Fetch> Checker<F> {
    pub fn new(fetcher: F, config: CheckConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Yield one row per pair, in order, as each check completes.
    ///
    /// The rate-limit pause is taken before every pair except the first.
    pub fn check_stream<'a>(&'a self, pairs: &'a [CheckPair]) -> BoxStream<'a, CheckRow> {
        let total = pairs.len();
        stream::iter(pairs.iter().enumerate())
            .then(move |(i, pair)| async move {
                if i > 0 {
                    if let Some(delay) = self.config.rate_limit.delay() {
                        tokio::time::sleep(delay).await;
                    }
                }
                self.check_one(i + 1, total, pair).await
            })
            .boxed()
    }

    /// Check every pair and collect the rows.
    pub async fn check_all(&self, pairs: &[CheckPair]) -> Vec<CheckRow> {
        self.notify_start(pairs.len());
        let rows: Vec<CheckRow> = self.check_stream(pairs).collect().await;
        self.notify_complete(pairs.len(), rows.iter().filter(|r| r.is_ok()).count());
        rows
    }

    /// Check every pair, writing each row to `report` as soon as it is ready.
    pub async fn write_report(
        &self,
        pairs: &[CheckPair],
        report: &mut Report,
    ) -> Result<CheckStats, GeorefError> {
        let run_start = Instant::now();
        let mut stats = CheckStats::default();
        self.notify_start(pairs.len());

        let mut ok = 0;
        let mut rows = self.check_stream(pairs);
        while let Some(row) = rows.next().await {
            report.write_row(&row)?;
            stats.total_rows += 1;
            if row.is_ok() {
                ok += 1;
            }
            if row.manifest_status == Some(200) && row.num_canvases.is_some() {
                stats.manifests_ok += 1;
            }
            if row.image_status == Some(200) {
                stats.images_ok += 1;
            }
            if row.error.is_some() {
                stats.errors += 1;
            }
        }

        self.notify_complete(pairs.len(), ok);
        stats.total_duration_ms = run_start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    async fn check_one(&self, index: usize, total: usize, pair: &CheckPair) -> CheckRow {
        let cb = self.config.progress_callback.as_ref();
        let label = pair.label(index);
        if let Some(cb) = cb {
            cb.on_item_start(index, total, &label);
        }

        let row = match &pair.manifest_url {
            Some(url) => {
                check_pair(&self.fetcher, url, pair.image_uri.as_deref(), Utc::now()).await
            }
            None => {
                let mut row = CheckRow::new(Utc::now(), "");
                row.error = Some(CheckError::MissingField {
                    field: "manifest_url".into(),
                });
                row
            }
        };

        match row.problem() {
            None => {
                if let Some(cb) = cb {
                    cb.on_item_complete(index, total, &label);
                }
            }
            Some(problem) => {
                warn!("{}: {}", label, problem);
                if let Some(cb) = cb {
                    cb.on_item_error(index, total, &label, &problem);
                }
            }
        }
        row
    }

    fn notify_start(&self, total: usize) {
        info!("Checking {} manifests", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }
    }

    fn notify_complete(&self, total: usize, ok: usize) {
        info!("Check complete: {}/{} manifests reachable", ok, total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(total, ok);
        }
    }
}

/// Check every manifest listed in a metadata table and write the report.
///
/// # Errors
/// Only fatal problems are returned: unreadable metadata, an HTTP client
/// that cannot be built, or a report that cannot be written. Individual
/// manifests that fail are rows in the report.
pub async fn run_check(
    metadata_path: impl AsRef<Path>,
    report_path: impl AsRef<Path>,
    config: &CheckConfig,
) -> Result<CheckStats, GeorefError> {
    let rows = read_metadata(metadata_path.as_ref())?;
    let pairs = CheckPair::from_metadata(&rows);
    let fetcher = ReqwestFetcher::new(config)?;
    let mut report = Report::open(report_path, config.write_mode)?;
    Checker::new(fetcher, config.clone())
        .write_report(&pairs, &mut report)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory transport answering from a fixed table.
    #[derive(Default)]
    struct TableFetcher {
        responses: HashMap<String, Result<FetchResponse, CheckError>>,
        requested: Mutex<Vec<String>>,
    }

    impl TableFetcher {
        fn respond(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    body: body.to_vec(),
                }),
            );
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl Fetch for TableFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse, CheckError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(CheckError::Transport {
                        url: url.to_string(),
                        detail: "connection refused".into(),
                    })
                })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn manifest_v2(canvases: usize) -> Vec<u8> {
        let canvases: Vec<_> = (0..canvases)
            .map(|i| json!({"@id": format!("https://example.org/canvas/{i}")}))
            .collect();
        serde_json::to_vec(&json!({"sequences": [{"canvases": canvases}]})).unwrap()
    }

    #[tokio::test]
    async fn ok_manifest_counts_canvases_and_checks_image() {
        let fetcher = TableFetcher::default()
            .respond("https://m/1", 200, &manifest_v2(3))
            .respond("https://i/1", 200, b"");

        let row = check_pair(&fetcher, "https://m/1", Some("https://i/1"), now()).await;
        assert_eq!(row.datetime, "2024-05-01T08:00:00Z");
        assert_eq!(row.manifest_status, Some(200));
        assert_eq!(row.num_canvases, Some(3));
        assert_eq!(row.canvas_uri.as_deref(), Some("https://example.org/canvas/0"));
        assert_eq!(row.canvas_status, None);
        assert_eq!(row.image_uri.as_deref(), Some("https://i/1"));
        assert_eq!(row.image_status, Some(200));
        assert!(row.manifest_time.is_some() && row.image_time.is_some());
        assert!(row.is_ok());
    }

    #[tokio::test]
    async fn not_found_skips_image() {
        let fetcher = TableFetcher::default().respond("https://m/404", 404, b"gone");

        let row = check_pair(&fetcher, "https://m/404", Some("https://i/1"), now()).await;
        assert_eq!(row.manifest_status, Some(404));
        assert!(row.manifest_time.is_some());
        assert_eq!(row.num_canvases, None);
        assert_eq!(row.image_uri, None);
        assert_eq!(row.image_status, None);
        assert_eq!(row.image_time, None);
        assert_eq!(fetcher.requested(), ["https://m/404"]);
        assert_eq!(row.problem().as_deref(), Some("manifest HTTP 404"));
    }

    #[tokio::test]
    async fn invalid_json_is_recorded_not_fatal() {
        let fetcher = TableFetcher::default()
            .respond("https://m/bad", 200, b"<html>oops</html>")
            .respond("https://i/1", 200, b"");

        let row = check_pair(&fetcher, "https://m/bad", Some("https://i/1"), now()).await;
        assert_eq!(row.manifest_status, Some(200));
        assert_eq!(row.num_canvases, None);
        assert!(matches!(row.error, Some(CheckError::InvalidManifest { .. })));
        assert_eq!(row.image_status, Some(200));
        assert!(!row.is_ok());
    }

    #[tokio::test]
    async fn transport_failure_recorded() {
        let fetcher = TableFetcher::default();
        let row = check_pair(&fetcher, "https://down/1", Some("https://i/1"), now()).await;
        assert_eq!(row.manifest_status, None);
        assert!(row.manifest_time.is_some());
        assert!(matches!(row.error, Some(CheckError::Transport { .. })));
        assert_eq!(row.image_uri, None);
    }

    #[tokio::test]
    async fn image_transport_failure_keeps_manifest_fields() {
        let fetcher = TableFetcher::default().respond("https://m/1", 200, &manifest_v2(1));
        let row = check_pair(&fetcher, "https://m/1", Some("https://i/down"), now()).await;
        assert_eq!(row.num_canvases, Some(1));
        assert_eq!(row.image_uri.as_deref(), Some("https://i/down"));
        assert_eq!(row.image_status, None);
        assert!(matches!(row.error, Some(CheckError::Transport { ref url, .. }) if url == "https://i/down"));
    }

    #[test]
    fn presentation3_items_counted() {
        let body = serde_json::to_vec(&json!({
            "type": "Manifest",
            "items": [{"id": "https://example.org/c1"}, {"id": "https://example.org/c2"}]
        }))
        .unwrap();
        let summary = parse_manifest("https://m/3", &body).unwrap();
        assert_eq!(summary.canvas_count, 2);
        assert_eq!(summary.first_canvas.as_deref(), Some("https://example.org/c1"));
    }

    #[test]
    fn empty_sequences_is_invalid() {
        let body = serde_json::to_vec(&json!({"sequences": []})).unwrap();
        assert!(matches!(
            parse_manifest("https://m/x", &body),
            Err(CheckError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn pairs_from_metadata_keep_every_row() {
        let rows = vec![
            MetadataRow {
                georef_id: String::new(),
                image_uri: Some("https://i/1".into()),
                manifest_url: Some("https://m/1".into()),
            },
            MetadataRow {
                georef_id: "x".into(),
                image_uri: Some("https://i/2".into()),
                manifest_url: None,
            },
        ];
        let pairs = CheckPair::from_metadata(&rows);
        assert_eq!(
            pairs,
            vec![
                CheckPair::new("https://m/1", "https://i/1"),
                CheckPair {
                    manifest_url: None,
                    image_uri: Some("https://i/2".into()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn row_without_manifest_is_reported_not_fetched() {
        let fetcher = TableFetcher::default()
            .respond("https://m/1", 404, b"")
            .respond("https://i/2", 200, b"");
        let config = CheckConfig::builder().delay_ms(0).build().unwrap();
        let checker = Checker::new(fetcher, config);
        assert_eq!(checker.config().rate_limit, crate::config::RateLimit::None);

        let pairs = vec![
            CheckPair::new("https://m/1", "https://i/1"),
            CheckPair {
                manifest_url: None,
                image_uri: Some("https://i/2".into()),
            },
        ];
        let rows = checker.check_all(&pairs).await;
        assert_eq!(rows.len(), 2);

        let blank = &rows[1];
        assert_eq!(blank.manifest_url, "");
        assert_eq!(blank.manifest_status, None);
        assert_eq!(blank.manifest_time, None);
        assert_eq!(blank.image_uri, None);
        assert_eq!(blank.image_status, None);
        assert_eq!(
            blank.error,
            Some(CheckError::MissingField {
                field: "manifest_url".into()
            })
        );
        assert_eq!(checker.fetcher.requested(), ["https://m/1"]);
    }

    #[tokio::test]
    async fn checker_continues_after_failures() {
        let fetcher = TableFetcher::default()
            .respond("https://m/1", 200, b"not json")
            .respond("https://m/2", 200, &manifest_v2(2))
            .respond("https://i/2", 200, b"");
        let config = CheckConfig::builder().delay_ms(0).build().unwrap();
        let checker = Checker::new(fetcher, config);

        let pairs = vec![
            CheckPair::new("https://m/1", "https://i/1"),
            CheckPair::new("https://m/2", "https://i/2"),
        ];
        let rows = checker.check_all(&pairs).await;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].error.is_some());
        assert_eq!(rows[1].num_canvases, Some(2));
        assert!(rows[1].is_ok());
    }

    #[tokio::test]
    async fn delay_applied_between_pairs_only() {
        let fetcher = TableFetcher::default()
            .respond("https://m/a", 404, b"")
            .respond("https://m/b", 404, b"")
            .respond("https://m/c", 404, b"");
        let config = CheckConfig::builder().delay_ms(40).build().unwrap();
        let checker = Checker::new(fetcher, config);
        let pairs: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|k| CheckPair::new(format!("https://m/{k}"), "https://i/x"))
            .collect();

        let start = Instant::now();
        let rows = checker.check_all(&pairs).await;
        let elapsed = start.elapsed();

        assert_eq!(rows.len(), 3);
        assert!(elapsed >= std::time::Duration::from_millis(80), "{elapsed:?}");
        let urls: Vec<_> = rows.iter().map(|r| r.manifest_url.as_str()).collect();
        assert_eq!(urls, ["https://m/a", "https://m/b", "https://m/c"]);
    }

    #[tokio::test]
    async fn write_report_counts_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let fetcher = TableFetcher::default()
            .respond("https://m/1", 200, &manifest_v2(4))
            .respond("https://i/1", 200, b"")
            .respond("https://m/2", 500, b"");
        let config = CheckConfig::builder().delay_ms(0).build().unwrap();
        let checker = Checker::new(fetcher, config);
        let pairs = vec![
            CheckPair::new("https://m/1", "https://i/1"),
            CheckPair::new("https://m/2", "https://i/2"),
            CheckPair::new("https://m/3", "https://i/3"),
        ];

        let mut report = Report::open(&path, crate::config::WriteMode::Overwrite).unwrap();
        let stats = checker.write_report(&pairs, &mut report).await.unwrap();
        assert_eq!(stats.total_rows, 3);
        assert_eq!(stats.manifests_ok, 1);
        assert_eq!(stats.images_ok, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(report.rows_written(), 3);
        assert_eq!(report.path(), path.as_path());
        drop(report);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains(",https://m/1,200,"));
        assert!(lines[1].contains(",4,https://example.org/canvas/0,,https://i/1,200,"));
        assert!(lines[2].contains(",https://m/2,500,"));
    }
}
