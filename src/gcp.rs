//! Typed ground control points and naive corner derivation.
//!
//! Some map sheets only come with two control points, the top-left and
//! bottom-right corners. For a north-up sheet the other two corners follow by
//! swapping coordinates between them, which is enough for a polynomial
//! transform to get started.

use crate::annotation::Feature;
use crate::config::PixelProperty;
use serde::{Deserialize, Serialize};
use serde_json::Number;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

/// A ground control point: a geographic position pinned to an image pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gcp {
    pub coordinates: LatLng,
    #[serde(rename = "resourceCoords")]
    pub resource_coords: PixelCoord,
}

/// Axis order of the emitted GeoJSON `coordinates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisOrder {
    /// `[lng, lat]`, as GeoJSON prescribes. (default)
    #[default]
    LngLat,
    /// `[lat, lng]`, as emitted by the first annotation prototypes.
    LatLng,
}

impl Gcp {
    pub fn new(lat: f64, lng: f64, x: u32, y: u32) -> Self {
        Gcp {
            coordinates: LatLng { lat, lng },
            resource_coords: PixelCoord { x, y },
        }
    }

    /// Render as a GeoJSON point feature.
    ///
    /// Returns `None` when a coordinate is NaN or infinite, since JSON has no
    /// representation for either.
    pub fn to_feature(&self, pixel_property: PixelProperty, order: AxisOrder) -> Option<Feature> {
        let LatLng { lat, lng } = self.coordinates;
        let (first, second) = match order {
            AxisOrder::LngLat => (lng, lat),
            AxisOrder::LatLng => (lat, lng),
        };
        let coordinates = [Number::from_f64(first)?, Number::from_f64(second)?];
        let pixel = [
            Number::from(self.resource_coords.x),
            Number::from(self.resource_coords.y),
        ];
        Some(Feature::point(pixel_property.as_str(), pixel, coordinates))
    }
}

/// Derive the bottom-left corner from the top-left and bottom-right corners.
pub fn naive_third_gcp(top_left: &Gcp, bottom_right: &Gcp) -> Gcp {
    Gcp::new(
        top_left.coordinates.lat,
        bottom_right.coordinates.lng,
        top_left.resource_coords.x,
        bottom_right.resource_coords.y,
    )
}

/// Derive the top-right corner from the top-left and bottom-right corners.
pub fn naive_fourth_gcp(top_left: &Gcp, bottom_right: &Gcp) -> Gcp {
    Gcp::new(
        bottom_right.coordinates.lat,
        top_left.coordinates.lng,
        bottom_right.resource_coords.x,
        top_left.resource_coords.y,
    )
}
