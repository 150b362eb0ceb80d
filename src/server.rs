use crate::classify;
use crate::config::AppConfig;
use crate::projection::Projection;
use crate::render::{Frame, Scene};
use crate::state::{RenderSink, View};
use crate::types::{EnrichedRecord, RegionFeature};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing over feature bounding boxes
pub struct RegionIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Single-slot "latest frame" sink: each render overwrites the previous
/// frame, so a reader always sees the most recent event and nothing stale.
#[derive(Default)]
pub struct LatestFrame {
    last: Option<Frame>,
}

impl LatestFrame {
    pub fn latest(&self) -> Option<&Frame> {
        self.last.as_ref()
    }
}

impl RenderSink for LatestFrame {
    fn render(&mut self, frame: &Frame) {
        self.last = Some(frame.clone());
    }
}

pub struct AppState {
    pub scene: Scene,
    pub features: Vec<RegionFeature>,
    pub tree: RTree<RegionIndex>,
    // Multi-client surface: the view is single-writer by construction, so
    // every pointer event takes the lock for its whole update-and-render.
    pub view: Mutex<View<LatestFrame>>,
}

#[derive(Deserialize)]
pub struct PointerParams {
    x: f64,
    y: f64,
}

pub async fn start_server(
    config: AppConfig,
    features: Vec<RegionFeature>,
    records: Vec<EnrichedRecord>,
    projection: Projection,
    scene: Scene,
) -> Result<()> {
    info!("Building spatial index for hover queries...");
    let tree_items: Vec<RegionIndex> = features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            feature.geometry.bounding_rect().map(|rect| RegionIndex {
                index,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let view = View::new(scene.clone(), records, projection, LatestFrame::default());
    let state = Arc::new(AppState {
        scene,
        features,
        tree,
        view: Mutex::new(view),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/scene", get(scene_handler))
        .route("/api/pointer", get(pointer_handler))
        .nest_service("/", ServeDir::new("."))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn scene_handler(State(state): State<Arc<AppState>>) -> Json<Scene> {
    Json(state.scene.clone())
}

enum Hit {
    Marker(EnrichedRecord),
    Region(String),
    Miss,
}

/// One pointer event: hover transition for whatever sits under the cursor
/// (markers draw above regions, so they win), then the pointer-move
/// transition. Returns the latest rendered frame.
async fn pointer_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointerParams>,
) -> Json<Option<Frame>> {
    let mut view = state.view.lock().await;

    let hit = locate(&state, &view, params.x, params.y);
    match hit {
        Hit::Marker(payload) => view.hover_marker(payload),
        Hit::Region(name) => view.hover_region(&name),
        Hit::Miss => {}
    }
    view.pointer_moved(params.x, params.y);

    Json(view.sink().latest().cloned())
}

fn locate(state: &AppState, view: &View<LatestFrame>, x: f64, y: f64) -> Hit {
    if let Some(record) = marker_at(view.records(), x, y) {
        return Hit::Marker(record.clone());
    }

    let (lon, lat) = view.projection().inverse(x, y);
    let point = Point::new(lon, lat);
    let envelope = AABB::from_point([lon, lat]);
    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        if let Some(feature) = state.features.get(candidate.index) {
            if feature.geometry.contains(&point) {
                return Hit::Region(feature.name.clone());
            }
        }
    }
    Hit::Miss
}

fn marker_at(records: &[EnrichedRecord], x: f64, y: f64) -> Option<&EnrichedRecord> {
    records.iter().find(|record| {
        let radius = classify::marker_radius(record.record.total);
        let (ax, ay) = record.anchor;
        radius > 0.0 && (x - ax).powi(2) + (y - ay).powi(2) <= radius * radius
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DemographicRecord;

    fn enriched(id: &str, total: u64, anchor: (f64, f64)) -> EnrichedRecord {
        EnrichedRecord {
            record: DemographicRecord {
                id: id.to_string(),
                name: format!("Region {id}"),
                counts: vec![total],
                total,
            },
            anchor,
        }
    }

    #[test]
    fn marker_hit_test_uses_the_log_radius() {
        let records = vec![enriched("6", 1_000_000, (100.0, 100.0))];
        let radius = classify::marker_radius(1_000_000); // 12.0

        assert!(marker_at(&records, 100.0, 100.0).is_some());
        assert!(marker_at(&records, 100.0 + radius - 0.1, 100.0).is_some());
        assert!(marker_at(&records, 100.0 + radius + 0.1, 100.0).is_none());
    }

    #[test]
    fn zero_total_markers_are_never_hit() {
        let records = vec![enriched("6", 0, (100.0, 100.0))];
        assert!(marker_at(&records, 100.0, 100.0).is_none());
    }

    #[test]
    fn first_marker_wins_when_markers_overlap() {
        let records = vec![
            enriched("6", 1_000_000, (100.0, 100.0)),
            enriched("36", 1_000_000, (102.0, 100.0)),
        ];
        let hit = marker_at(&records, 101.0, 100.0).unwrap();
        assert_eq!(hit.record.id, "6");
    }
}
