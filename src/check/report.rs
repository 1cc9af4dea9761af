//! CSV report of reachability results.

use crate::check::CheckRow;
use crate::config::WriteMode;
use crate::error::GeorefError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column order of the report. Mirrors the field order of [`CheckRow`].
pub const REPORT_COLUMNS: [&str; 10] = [
    "datetime",
    "manifest_url",
    "manifest_status",
    "manifest_time",
    "num_canvases",
    "canvas_uri",
    "canvas_status",
    "image_uri",
    "image_status",
    "image_time",
];

/// An open report file. Each row is flushed as soon as it is written, so a
/// run that dies half-way still leaves every completed row on disk.
pub struct Report {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl Report {
    /// Open `path` for writing.
    ///
    /// [`WriteMode::Overwrite`] truncates the file, [`WriteMode::Append`]
    /// keeps existing rows. Either way the header line is written only when
    /// the file is empty at open time.
    pub fn open(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self, GeorefError> {
        let path = path.as_ref().to_path_buf();
        let fail = |detail: String| GeorefError::ReportWriteFailed {
            path: path.clone(),
            detail,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Overwrite => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let file = options.open(&path).map_err(|e| fail(e.to_string()))?;
        let is_empty = file.metadata().map_err(|e| fail(e.to_string()))?.len() == 0;

        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);

        info!(
            "Writing report to {} ({:?}, header: {})",
            path.display(),
            mode,
            is_empty
        );
        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    pub fn write_row(&mut self, row: &CheckRow) -> Result<(), GeorefError> {
        self.writer
            .serialize(row)
            .and_then(|_| self.writer.flush().map_err(csv::Error::from))
            .map_err(|e| GeorefError::ReportWriteFailed {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
