//! Ground control points as GeoJSON point features.

use crate::annotation::Feature;
use crate::config::PixelProperty;
use crate::record::ControlPoint;

/// One `Point` feature per control point, in input order.
///
/// Geometry coordinates are the control point's `location` as stored, and the
/// pixel position goes under `pixel_property`. No dedup, no reordering, no
/// range checks.
pub fn build_features(gcps: &[ControlPoint], pixel_property: PixelProperty) -> Vec<Feature> {
    gcps.iter()
        .map(|gcp| Feature::point(pixel_property.as_str(), gcp.pixel.clone(), gcp.location.clone()))
        .collect()
}
