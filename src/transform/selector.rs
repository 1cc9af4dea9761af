//! SVG selector construction.

use crate::error::RecordError;
use crate::record::{require, Coord};
use serde_json::Value;

/// Render the cutline polygon as an SVG document for an `SvgSelector`.
///
/// The final point is always dropped: Klokan cutlines are closed (the last
/// point repeats the first) while SVG polygons close implicitly. The drop is
/// unconditional; an open input loses its last vertex.
pub fn build_selector(cutlines: &[Coord], width: u64, height: u64) -> String {
    let open = &cutlines[..cutlines.len().saturating_sub(1)];
    let points = open
        .iter()
        .map(|[x, y]| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(r#"<svg width="{width}" height="{height}"><polygon points="{points}" /></svg>"#)
}

/// [`build_selector`] over an untyped record.
///
/// Fails with [`RecordError::MissingField`] when `new_cutlines` or
/// `map.image.{width,height}` is absent.
pub fn build_selector_from_value(record: &Value) -> Result<String, RecordError> {
    let cutlines = require(record, &["new_cutlines"])?;
    let height = require(record, &["map", "image", "height"])?;
    let width = require(record, &["map", "image", "width"])?;

    let cutlines: Vec<Coord> =
        serde_json::from_value(cutlines.clone()).map_err(|e| RecordError::InvalidRecord {
            detail: format!("new_cutlines: {e}"),
        })?;
    let dimension = |v: &Value, name: &str| {
        v.as_u64().ok_or_else(|| RecordError::InvalidRecord {
            detail: format!("map.image.{name} is not a non-negative integer"),
        })
    };

    Ok(build_selector(
        &cutlines,
        dimension(width, "width")?,
        dimension(height, "height")?,
    ))
}
