use crate::projection::Projection;
use crate::types::{DemographicRecord, EnrichedRecord, RegionFeature};
use geo::Centroid;
use std::collections::HashMap;
use tracing::warn;

/// Anchor for records with no usable geometry: far enough outside any
/// viewport that the marker renders but is never visible.
pub const OFFSCREEN_ANCHOR: (f64, f64) = (-100.0, -100.0);

/// Associate each record with its region by canonical id and compute its
/// screen-space anchor. Runs once at load time; the inputs are not mutated.
///
/// Unmatched records and degenerate geometries get the off-screen sentinel
/// rather than an error, so one bad row never blocks the rest of the map.
/// Duplicate feature ids resolve to the first feature in collection order.
pub fn join(
    features: &[RegionFeature],
    records: Vec<DemographicRecord>,
    projection: &Projection,
) -> Vec<EnrichedRecord> {
    let mut by_id: HashMap<&str, &RegionFeature> = HashMap::with_capacity(features.len());
    for feature in features {
        // first feature wins on duplicate ids
        by_id.entry(feature.id.as_str()).or_insert(feature);
    }

    records
        .into_iter()
        .map(|record| {
            let anchor = match by_id.get(record.id.as_str()) {
                Some(feature) => {
                    match projection.project_geometry(&feature.geometry).centroid() {
                        Some(centroid)
                            if centroid.x().is_finite() && centroid.y().is_finite() =>
                        {
                            (centroid.x(), centroid.y())
                        }
                        _ => {
                            warn!(id = %record.id, "degenerate geometry; marker moved off-screen");
                            OFFSCREEN_ANCHOR
                        }
                    }
                }
                None => {
                    warn!(id = %record.id, "no matching region; marker moved off-screen");
                    OFFSCREEN_ANCHOR
                }
            };
            EnrichedRecord { record, anchor }
        })
        .collect()
}
