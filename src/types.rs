use geo::MultiPolygon;
use serde::Serialize;

/// One administrative region boundary, keyed by its canonical region code.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    pub id: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// One row of per-region category counts. `counts` is aligned with the
/// configured category order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicRecord {
    pub id: String,
    pub name: String,
    pub counts: Vec<u64>,
    pub total: u64,
}

impl DemographicRecord {
    pub fn count(&self, index: usize) -> u64 {
        self.counts.get(index).copied().unwrap_or(0)
    }
}

/// Join output: the record plus its screen-space marker anchor. Unmatched
/// and degenerate records carry the off-screen sentinel anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub record: DemographicRecord,
    pub anchor: (f64, f64),
}
