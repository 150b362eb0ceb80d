use crate::projection::Projection;
use crate::render::{self, Frame, Scene};
use crate::types::EnrichedRecord;
use serde::Serialize;

/// What the pointer currently rests on. A marker hover carries the full
/// enriched record, not a reference into some other snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoverTarget {
    #[default]
    None,
    Region { name: String },
    Marker { payload: EnrichedRecord },
}

/// The single mutable interaction record. The hover target is replaced
/// wholesale on each event; the pointer's geographic position updates on
/// every move regardless of hover. There is no pointer-leave transition:
/// once set, the hover stays until the next hover event, matching the
/// observed behavior of the view this engine drives.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct InteractionState {
    pub hover: HoverTarget,
    /// Last inverse-projected pointer position, (lon, lat).
    pub pointer: Option<(f64, f64)>,
}

/// The external renderer seam. Called synchronously with a full snapshot
/// on every state transition, one call per event.
pub trait RenderSink {
    fn render(&mut self, frame: &Frame);
}

/// Owns the immutable scene data and the one mutable interaction state,
/// and drives the sink. Single writer, single reader; a concurrent caller
/// must serialize access around the whole event call.
pub struct View<R: RenderSink> {
    scene: Scene,
    records: Vec<EnrichedRecord>,
    projection: Projection,
    state: InteractionState,
    sink: R,
}

impl<R: RenderSink> View<R> {
    pub fn new(scene: Scene, records: Vec<EnrichedRecord>, projection: Projection, sink: R) -> Self {
        View {
            scene,
            records,
            projection,
            state: InteractionState::default(),
            sink,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Pointer entered a region polygon.
    pub fn hover_region(&mut self, name: &str) {
        self.state.hover = HoverTarget::Region {
            name: name.to_string(),
        };
        self.redraw();
    }

    /// Pointer entered a marker. Any previously stored hover payload is
    /// discarded with the old target.
    pub fn hover_marker(&mut self, payload: EnrichedRecord) {
        self.state.hover = HoverTarget::Marker { payload };
        self.redraw();
    }

    /// Pointer moved anywhere over the drawing surface.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        self.state.pointer = Some(self.projection.inverse(x, y));
        self.redraw();
    }

    // Exactly one render pass per transition, no batching.
    fn redraw(&mut self) {
        let frame = render::frame(&self.scene, &self.state);
        self.sink.render(&frame);
    }
}
