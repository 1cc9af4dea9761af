//! Record transforms: Klokan record → IIIF annotation page or Allmaps record.
//!
//! Everything in here is pure: no I/O, no clocks, no random ids. The same
//! record and identifiers always produce the same document, so re-running a
//! conversion only rewrites files with identical content.
//!
//! The transforms are schema-literal. They relocate fields and never validate
//! geographic ranges, polygon simplicity or coordinate order.
//!
//! 1. [`selector`]: cutline polygon → SVG selector string
//! 2. [`features`]: ground control points → GeoJSON point features

pub mod features;
pub mod selector;

pub use features::build_features;
pub use selector::{build_selector, build_selector_from_value};

use crate::annotation::{
    AllmapsGcp, AllmapsImage, AllmapsRecord, Annotation, AnnotationPage, FeatureCollection,
    ImageService, SvgSelector, Target, Transformation, ANNO_CONTEXT, GEOJSON_CONTEXT,
    PRESENTATION3_CONTEXT,
};
use crate::config::PixelProperty;
use crate::record::KlokanRecord;

/// Knobs that change the shape of the annotation without changing its meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub pixel_property: PixelProperty,
}

/// Convert a record into an AnnotationPage containing one georeferencing Annotation.
///
/// # Arguments
/// * `record`   : enhanced Klokan record
/// * `georef_id`: annotation identifier, appended to `base_uri`
/// * `image_uri`: IIIF Image API base URI of the georeferenced scan
/// * `base_uri` : base URI for the AnnotationPage and Annotation ids
pub fn transform(
    record: &KlokanRecord,
    georef_id: &str,
    image_uri: &str,
    base_uri: &str,
    options: &TransformOptions,
) -> AnnotationPage {
    let page_id = format!("{base_uri}/{georef_id}");

    let annotation = Annotation {
        id: format!("{page_id}#anno"),
        kind: "Annotation".into(),
        context: vec![
            ANNO_CONTEXT.into(),
            GEOJSON_CONTEXT.into(),
            PRESENTATION3_CONTEXT.into(),
        ],
        motivation: "georeferencing".into(),
        target: Target {
            kind: "Image".into(),
            source: format!("{image_uri}/full/full/0/default.jpg"),
            service: vec![ImageService {
                id: image_uri.to_string(),
                kind: "ImageService2".into(),
            }],
            selector: SvgSelector {
                kind: "SvgSelector".into(),
                value: build_selector(&record.cutlines, record.width(), record.height()),
            },
        },
        body: FeatureCollection {
            kind: "FeatureCollection".into(),
            purpose: "gcp-georeferencing".into(),
            transformation: Transformation {
                kind: "polynomial".into(),
                order: 0,
            },
            features: build_features(&record.ground_control_points, options.pixel_property),
        },
    };

    AnnotationPage {
        context: vec![ANNO_CONTEXT.into()],
        kind: "AnnotationPage".into(),
        id: page_id,
        items: vec![annotation],
    }
}

/// Convert a record into the Allmaps georeference format.
///
/// Allmaps wants an open polygon, so the closing cutline point is dropped the
/// same way [`build_selector`] drops it.
pub fn to_allmaps(record: &KlokanRecord, georef_id: &str, image_uri: &str) -> AllmapsRecord {
    let mask_len = record.cutlines.len().saturating_sub(1);
    AllmapsRecord {
        id: georef_id.to_string(),
        image: AllmapsImage {
            id: georef_id.to_string(),
            uri: image_uri.to_string(),
            kind: "ImageService2".into(),
            width: record.width(),
            height: record.height(),
        },
        version: 1,
        gcps: record
            .ground_control_points
            .iter()
            .map(|gcp| AllmapsGcp {
                world: gcp.location.clone(),
                image: gcp.pixel.clone(),
            })
            .collect(),
        pixel_mask: record.cutlines[..mask_len].to_vec(),
    }
}
