//! Output document types: IIIF georeference annotations and Allmaps records.
//!
//! Field declaration order matches the order consumers are used to seeing in
//! the JSON, since `serde` serialises struct fields in declaration order.

use crate::record::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ANNO_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";
pub const GEOJSON_CONTEXT: &str = "http://geojson.org/geojson-ld/geojson-context.jsonld";
pub const PRESENTATION3_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

/// A W3C AnnotationPage holding the georeferencing annotation for one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub items: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub motivation: String,
    pub target: Target,
    pub body: FeatureCollection,
}

/// The image being georeferenced, narrowed by an SVG selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub service: Vec<ImageService>,
    pub selector: SvgSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageService {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvgSelector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub purpose: String,
    pub transformation: Transformation,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    #[serde(rename = "type")]
    pub kind: String,
    pub order: u32,
}

/// One ground control point as a GeoJSON feature.
///
/// `properties` holds a single entry whose key is the configured
/// [`crate::config::PixelProperty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, Coord>,
    pub geometry: PointGeometry,
}

impl Feature {
    pub fn point(property_key: &str, pixel: Coord, coordinates: Coord) -> Self {
        Feature {
            kind: "Feature".into(),
            properties: BTreeMap::from([(property_key.to_string(), pixel)]),
            geometry: PointGeometry {
                kind: "Point".into(),
                coordinates,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Coord,
}

// ── Allmaps ──────────────────────────────────────────────────────────────

/// A georeference record in the Allmaps JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllmapsRecord {
    pub id: String,
    pub image: AllmapsImage,
    pub version: u32,
    pub gcps: Vec<AllmapsGcp>,
    #[serde(rename = "pixelMask")]
    pub pixel_mask: Vec<Coord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllmapsImage {
    pub id: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllmapsGcp {
    pub world: Coord,
    pub image: Coord,
}
