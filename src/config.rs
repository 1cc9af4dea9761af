//! Configuration types for conversion and reachability checks.
//!
//! Conversion behaviour is controlled through [`ConvertConfig`] and checker
//! behaviour through [`CheckConfig`]; both are built via builders that
//! validate on [`build`](ConvertConfigBuilder::build). Callers set only what
//! they care about and rely on documented defaults for the rest.

use crate::error::GeorefError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Conversion ───────────────────────────────────────────────────────────

/// Configuration for a batch conversion of Klokan records.
///
/// # Example
/// ```rust
/// use georef_iiif::{ConvertConfig, PixelProperty};
///
/// let config = ConvertConfig::builder()
///     .input_dir("klokan")
///     .output_dir("annotations")
///     .base_uri("https://maps.example.org/georef")
///     .pixel_property(PixelProperty::PixelCoords)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_uri, "https://maps.example.org/georef");
/// ```
#[derive(Clone)]
pub struct ConvertConfig {
    /// Root of the sharded Klokan record tree. Default: `.`.
    pub input_dir: PathBuf,

    /// Where converted files are written; created recursively. Default: `./output`.
    pub output_dir: PathBuf,

    /// Base URI for AnnotationPage and Annotation ids, without trailing slash.
    /// Required for [`OutputFormat::IiifAnnotation`].
    pub base_uri: String,

    /// Output document shape. Default: [`OutputFormat::IiifAnnotation`].
    pub format: OutputFormat,

    /// Feature property key carrying pixel coordinates. Default: `resourceCoords`.
    pub pixel_property: PixelProperty,

    /// Directory layout for output files. Default: [`Sharding::ByFirstChar`].
    pub sharding: Sharding,

    /// Optional per-record progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./output"),
            base_uri: String::new(),
            format: OutputFormat::default(),
            pixel_property: PixelProperty::default(),
            sharding: Sharding::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("base_uri", &self.base_uri)
            .field("format", &self.format)
            .field("pixel_property", &self.pixel_property)
            .field("sharding", &self.sharding)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ConvertConfig {
    /// Create a new builder for `ConvertConfig`.
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.input_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Trailing slashes are trimmed so ids never contain `//`.
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.base_uri = uri.into().trim_end_matches('/').to_string();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn pixel_property(mut self, property: PixelProperty) -> Self {
        self.config.pixel_property = property;
        self
    }

    pub fn sharding(mut self, sharding: Sharding) -> Self {
        self.config.sharding = sharding;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, GeorefError> {
        let c = &self.config;
        if c.format == OutputFormat::IiifAnnotation && c.base_uri.is_empty() {
            return Err(GeorefError::InvalidConfig(
                "a base URI is required for IIIF annotation output".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(GeorefError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Reachability checks ──────────────────────────────────────────────────

/// Configuration for a reachability check run.
#[derive(Clone)]
pub struct CheckConfig {
    /// Pause between consecutive pairs. Default: fixed 500 ms.
    pub rate_limit: RateLimit,

    /// Whether an existing report is truncated or extended. Default: overwrite.
    pub write_mode: WriteMode,

    /// Per-request timeout in seconds. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Optional per-row progress events.
    pub progress_callback: Option<ProgressCallback>,
}

/// The delay the checker has always used between pairs.
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_millis(500);

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimit::default(),
            write_mode: WriteMode::default(),
            timeout_secs: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CheckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckConfig")
            .field("rate_limit", &self.rate_limit)
            .field("write_mode", &self.write_mode)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl CheckConfig {
    /// Create a new builder for `CheckConfig`.
    pub fn builder() -> CheckConfigBuilder {
        CheckConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CheckConfig`].
#[derive(Debug)]
pub struct CheckConfigBuilder {
    config: CheckConfig,
}

impl CheckConfigBuilder {
    pub fn rate_limit(mut self, policy: RateLimit) -> Self {
        self.config.rate_limit = policy;
        self
    }

    /// Shorthand for `rate_limit(RateLimit::FixedDelay(..))`; zero disables the delay.
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.config.rate_limit = if ms == 0 {
            RateLimit::None
        } else {
            RateLimit::FixedDelay(Duration::from_millis(ms))
        };
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.config.write_mode = mode;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CheckConfig, GeorefError> {
        let c = &self.config;
        if c.timeout_secs == Some(0) {
            return Err(GeorefError::InvalidConfig(
                "timeout must be at least one second".into(),
            ));
        }
        if c.user_agent.trim().is_empty() {
            return Err(GeorefError::InvalidConfig(
                "user agent must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Property key under which a feature carries its pixel coordinates.
///
/// Two generations of the converter disagree on this key. Allmaps reads
/// `resourceCoords`; older annotation consumers expect `pixelCoords`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelProperty {
    /// `"resourceCoords"` (default)
    #[default]
    ResourceCoords,
    /// `"pixelCoords"`
    PixelCoords,
}

impl PixelProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResourceCoords => "resourceCoords",
            Self::PixelCoords => "pixelCoords",
        }
    }
}

/// Shape of each converted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// IIIF AnnotationPage with one georeferencing Annotation. (default)
    #[default]
    IiifAnnotation,
    /// Allmaps georeference JSON (`gcps` + `pixelMask`).
    Allmaps,
}

/// How record files are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sharding {
    /// `<root>/<first char of id>/<id>.json` (default)
    #[default]
    ByFirstChar,
    /// `<root>/<id>.json`
    Flat,
}

/// Pause applied by the checker after each pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateLimit {
    /// No pause; for tests and local endpoints.
    None,
    /// Sleep this long after every pair except the last.
    FixedDelay(Duration),
}

impl Default for RateLimit {
    fn default() -> Self {
        RateLimit::FixedDelay(DEFAULT_CHECK_DELAY)
    }
}

impl RateLimit {
    /// The pause to apply, if any.
    pub fn delay(self) -> Option<Duration> {
        match self {
            RateLimit::None => None,
            RateLimit::FixedDelay(d) if d.is_zero() => None,
            RateLimit::FixedDelay(d) => Some(d),
        }
    }
}

/// What to do with an existing report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WriteMode {
    /// Truncate and start over. (default)
    #[default]
    Overwrite,
    /// Keep existing rows and add new ones below.
    Append,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_requires_base_uri_for_iiif() {
        let err = ConvertConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("base URI"));
    }

    #[test]
    fn allmaps_does_not_need_base_uri() {
        let config = ConvertConfig::builder()
            .format(OutputFormat::Allmaps)
            .build()
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.sharding, Sharding::ByFirstChar);
    }

    #[test]
    fn base_uri_trailing_slash_trimmed() {
        let config = ConvertConfig::builder()
            .base_uri("https://example.org/annos///")
            .build()
            .unwrap();
        assert_eq!(config.base_uri, "https://example.org/annos");
    }

    #[test]
    fn check_defaults() {
        let config = CheckConfig::default();
        assert_eq!(config.rate_limit.delay(), Some(Duration::from_millis(500)));
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert!(config.timeout_secs.is_none());
        assert!(config.user_agent.starts_with("georef-iiif/"));
    }

    #[test]
    fn zero_delay_disables_rate_limit() {
        let config = CheckConfig::builder().delay_ms(0).build().unwrap();
        assert_eq!(config.rate_limit, RateLimit::None);
        assert_eq!(config.rate_limit.delay(), None);
        assert_eq!(RateLimit::FixedDelay(Duration::ZERO).delay(), None);
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(CheckConfig::builder().timeout_secs(0).build().is_err());
    }

    #[test]
    fn pixel_property_keys() {
        assert_eq!(PixelProperty::default().as_str(), "resourceCoords");
        assert_eq!(PixelProperty::PixelCoords.as_str(), "pixelCoords");
    }

    #[test]
    fn debug_hides_callback() {
        let config = CheckConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("<dyn BatchProgressCallback>"));
    }
}
