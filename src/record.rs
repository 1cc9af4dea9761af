//! The enhanced Klokan record: the input side of the transform.
//!
//! Klokan's Georeferencer exports one JSON document per map sheet. The
//! "enhanced" variant we consume adds `new_cutlines` (the closed polygon that
//! delimits the usable map area) and `new_gcps` (pixel ↔ geographic control
//! point pairs). Everything else in the export is ignored.
//!
//! Coordinates are kept as [`serde_json::Number`] rather than being parsed
//! into `i64`/`f64`: the transform only relocates values, and keeping the
//! original number representation means `218` stays `218` (not `218.0`) in
//! both the SVG selector and the GeoJSON output.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A two-component coordinate, preserved exactly as it appeared in the input.
pub type Coord = [Number; 2];

/// One enhanced Klokan record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlokanRecord {
    /// Closed pixel polygon; the last point repeats the first.
    #[serde(rename = "new_cutlines")]
    pub cutlines: Vec<Coord>,

    /// Ground control points in the order the georeferencer stored them.
    #[serde(rename = "new_gcps")]
    pub ground_control_points: Vec<ControlPoint>,

    pub map: MapInfo,
}

/// A single pixel ↔ location pair.
///
/// `location` is copied to the output untouched. The Klokan export stores it
/// as `[lng, lat]`, but nothing here depends on or checks that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub pixel: Coord,
    pub location: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub image: ImageInfo,
}

/// Dimensions of the source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u64,
    pub height: u64,
}

/// Keys every record must carry, as paths from the document root.
const REQUIRED_PATHS: &[&[&str]] = &[
    &["new_cutlines"],
    &["new_gcps"],
    &["map", "image", "width"],
    &["map", "image", "height"],
];

impl KlokanRecord {
    /// Build a record from an already-parsed JSON document.
    ///
    /// Absent keys fail with [`RecordError::MissingField`] naming the first
    /// missing key as a dotted path (`map.image.width`, `new_gcps[3].pixel`).
    /// Present keys with the wrong shape, or an empty cutline or GCP list,
    /// fail with [`RecordError::InvalidRecord`]. Nothing is defaulted.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        for path in REQUIRED_PATHS {
            require(&value, path)?;
        }
        if let Some(gcps) = value.get("new_gcps").and_then(Value::as_array) {
            for (i, gcp) in gcps.iter().enumerate() {
                for key in ["pixel", "location"] {
                    if gcp.get(key).is_none() {
                        return Err(RecordError::missing(format!("new_gcps[{i}].{key}")));
                    }
                }
            }
        }

        let record: KlokanRecord =
            serde_json::from_value(value).map_err(|e| RecordError::InvalidRecord {
                detail: e.to_string(),
            })?;
        if record.cutlines.is_empty() {
            return Err(RecordError::InvalidRecord {
                detail: "new_cutlines is empty".into(),
            });
        }
        if record.ground_control_points.is_empty() {
            return Err(RecordError::InvalidRecord {
                detail: "new_gcps is empty".into(),
            });
        }
        Ok(record)
    }

    /// Parse a record from raw JSON bytes.
    ///
    /// Syntax errors are reported as [`RecordError::InvalidRecord`]; callers
    /// that know the source path should prefer [`crate::convert`] helpers,
    /// which attach it.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| RecordError::InvalidRecord {
                detail: e.to_string(),
            })?;
        Self::from_value(value)
    }

    pub fn width(&self) -> u64 {
        self.map.image.width
    }

    pub fn height(&self) -> u64 {
        self.map.image.height
    }
}

/// Walk `path` from the root of `value`, failing on the first absent segment.
pub(crate) fn require<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value, RecordError> {
    let mut current = value;
    for (depth, key) in path.iter().enumerate() {
        current = current
            .get(*key)
            .ok_or_else(|| RecordError::missing(path[..=depth].join(".")))?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "new_cutlines": [[218, 5746], [5689, 5734], [5686, 324], [204, 318], [218, 5746]],
            "new_gcps": [
                {"pixel": [633, 613], "location": [107.565833333333, -6.87388888888889]},
                {"pixel": [6257, 5360], "location": [107.65, -6.94833333333333]}
            ],
            "map": {"image": {"width": 5934, "height": 6704, "type": "iiif"}},
            "title": "ignored"
        })
    }

    #[test]
    fn parses_well_formed_record() {
        let record = KlokanRecord::from_value(sample()).unwrap();
        assert_eq!(record.cutlines.len(), 5);
        assert_eq!(record.ground_control_points.len(), 2);
        assert_eq!(record.width(), 5934);
        assert_eq!(record.height(), 6704);
    }

    #[test]
    fn integers_stay_integers() {
        let record = KlokanRecord::from_value(sample()).unwrap();
        assert_eq!(record.cutlines[0][0].to_string(), "218");
        assert_eq!(
            record.ground_control_points[1].location[0].to_string(),
            "107.65"
        );
    }

    #[test]
    fn empty_record_reports_first_missing_key() {
        let err = KlokanRecord::from_value(json!({})).unwrap_err();
        match err {
            RecordError::MissingField { field } => assert_eq!(field, "new_cutlines"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nested_missing_key_is_dotted() {
        let mut value = sample();
        value["map"]["image"].as_object_mut().unwrap().remove("height");
        let err = KlokanRecord::from_value(value).unwrap_err();
        assert_eq!(err.to_string(), "missing field 'map.image.height'");
    }

    #[test]
    fn missing_map_reports_map() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("map");
        let err = KlokanRecord::from_value(value).unwrap_err();
        assert_eq!(err.to_string(), "missing field 'map'");
    }

    #[test]
    fn gcp_without_location_is_missing_field() {
        let mut value = sample();
        value["new_gcps"][1].as_object_mut().unwrap().remove("location");
        let err = KlokanRecord::from_value(value).unwrap_err();
        assert_eq!(err.to_string(), "missing field 'new_gcps[1].location'");
    }

    #[test]
    fn wrong_shape_is_invalid_record() {
        let mut value = sample();
        value["new_cutlines"] = json!("not a list");
        assert!(matches!(
            KlokanRecord::from_value(value),
            Err(RecordError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn empty_gcps_rejected() {
        let mut value = sample();
        value["new_gcps"] = json!([]);
        let err = KlokanRecord::from_value(value).unwrap_err();
        assert_eq!(err.to_string(), "malformed record: new_gcps is empty");
    }

    #[test]
    fn empty_cutlines_rejected() {
        let err = KlokanRecord::from_value(json!({
            "new_cutlines": [],
            "new_gcps": [],
            "map": {"image": {"width": 10, "height": 10}}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "malformed record: new_cutlines is empty");
    }

    #[test]
    fn from_slice_rejects_garbage() {
        assert!(matches!(
            KlokanRecord::from_slice(b"{ nope"),
            Err(RecordError::InvalidRecord { .. })
        ));
    }
}
