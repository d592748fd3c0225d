//! Client-side overlay for local vector datasets

use crate::measure::overlap;
use crate::{Aoi, Feature};
use landstat_domain::OverlayTag;

/// A feature found by an overlay, with its clipped geometry
#[derive(Debug, Clone)]
pub struct Hit {
    /// The feature, geometry clipped to the AOI or to the buffer ring
    pub feature: Feature,
    /// How the feature relates to the AOI
    pub tag: OverlayTag,
    /// Clipped area in hectares, for polygons
    pub overlap_ha: Option<f64>,
    /// Clipped share of the feature area, for polygons
    pub overlap_pct: Option<f64>,
}

/// Overlay features (in BC Albers) against the AOI
///
/// Features interacting with the AOI are tagged `INTERSECT`. When `buffer_m`
/// is set, features that miss the AOI but reach into the ring
/// `buffer(AOI) - AOI` are tagged `WITHIN {buffer_m} m`. A feature is reported
/// at most once.
pub fn overlay_features(aoi: &Aoi, features: &[Feature], buffer_m: Option<f64>) -> Vec<Hit> {
    let ring = buffer_m.filter(|b| *b > 0.0).map(|b| (b, aoi.buffer_ring(b)));

    let mut hits = Vec::new();
    for feature in features {
        if let Some(found) = overlap(&feature.geometry, aoi.shape()) {
            hits.push(hit(feature, OverlayTag::Intersect, found));
            continue;
        }

        if let Some((radius, ring)) = &ring {
            if let Some(found) = overlap(&feature.geometry, ring) {
                hits.push(hit(feature, OverlayTag::Within(*radius), found));
            }
        }
    }
    hits
}

fn hit(feature: &Feature, tag: OverlayTag, found: crate::Overlap) -> Hit {
    Hit {
        feature: Feature {
            attributes: feature.attributes.clone(),
            geometry: found.geometry,
        },
        tag,
        overlap_ha: found.area_ha,
        overlap_pct: found.percent,
    }
}
