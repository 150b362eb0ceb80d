use crate::classify;
use crate::config::AppConfig;
use crate::error::MapError;
use crate::projection::Projection;
use crate::state::{HoverTarget, InteractionState};
use crate::types::{EnrichedRecord, RegionFeature};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Everything the external renderer needs for the initial draw: projected
/// region outlines with their dominant-category fills, marker placements,
/// and the category swatch styles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub categories: Vec<CategoryStyle>,
    pub regions: Vec<RegionShape>,
    pub markers: Vec<MarkerShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStyle {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionShape {
    pub id: String,
    pub name: String,
    /// Projected boundary rings: exterior first, then any holes.
    pub rings: Vec<Vec<[f64; 2]>>,
    /// Dominant category name, or None for the neutral fill when no record
    /// matched this region.
    pub fill: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerShape {
    pub name: String,
    pub anchor: [f64; 2],
    pub radius: f64,
    pub tier: usize,
    pub color: String,
}

/// Per-event render input: the full interaction state snapshot plus the
/// tooltip derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub hover: HoverTarget,
    pub pointer: Option<[f64; 2]>,
    pub tooltip: Option<Tooltip>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub anchor: [f64; 2],
    pub name: String,
    pub lines: Vec<TooltipLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipLine {
    pub label: String,
    pub count: u64,
}

pub fn build_scene(
    config: &AppConfig,
    features: &[RegionFeature],
    records: &[EnrichedRecord],
    projection: &Projection,
) -> Result<Scene, MapError> {
    let mut by_id: HashMap<&str, &EnrichedRecord> = HashMap::with_capacity(records.len());
    for record in records {
        // first record wins on duplicate ids, mirroring the feature join
        by_id.entry(record.record.id.as_str()).or_insert(record);
    }

    let mut regions = Vec::with_capacity(features.len());
    for feature in features {
        let projected = projection.project_geometry(&feature.geometry);
        let mut rings: Vec<Vec<[f64; 2]>> = Vec::new();
        for polygon in &projected.0 {
            rings.push(polygon.exterior().coords().map(|c| [c.x, c.y]).collect());
            for interior in polygon.interiors() {
                rings.push(interior.coords().map(|c| [c.x, c.y]).collect());
            }
        }

        let fill = match by_id.get(feature.id.as_str()) {
            Some(enriched) => {
                Some(classify::dominant_category(&config.categories, &enriched.record)?.to_string())
            }
            None => None, // unmatched regions keep the neutral fill
        };

        regions.push(RegionShape {
            id: feature.id.clone(),
            name: feature.name.clone(),
            rings,
            fill,
        });
    }

    let markers = records
        .iter()
        .map(|enriched| {
            let tier = classify::size_tier(enriched.record.total);
            MarkerShape {
                name: enriched.record.name.clone(),
                anchor: [enriched.anchor.0, enriched.anchor.1],
                radius: classify::marker_radius(enriched.record.total),
                tier,
                color: config.marker.tier_colors[tier].clone(),
            }
        })
        .collect();

    Ok(Scene {
        width: config.viewport.width,
        height: config.viewport.height,
        categories: config
            .categories
            .iter()
            .map(|category| CategoryStyle {
                name: category.name.clone(),
                color: category.color.clone(),
            })
            .collect(),
        regions,
        markers,
    })
}

/// Snapshot the state into a frame. The tooltip appears only for a marker
/// hover; region hovers and bare pointer moves never carry detail content.
pub fn frame(scene: &Scene, state: &InteractionState) -> Frame {
    Frame {
        hover: state.hover.clone(),
        pointer: state.pointer.map(|(lon, lat)| [lon, lat]),
        tooltip: tooltip(scene, state),
    }
}

pub fn tooltip(scene: &Scene, state: &InteractionState) -> Option<Tooltip> {
    match &state.hover {
        HoverTarget::Marker { payload } => Some(Tooltip {
            anchor: [payload.anchor.0, payload.anchor.1],
            name: payload.record.name.clone(),
            lines: scene
                .categories
                .iter()
                .enumerate()
                .map(|(index, category)| TooltipLine {
                    label: category.name.clone(),
                    count: payload.record.count(index),
                })
                .collect(),
        }),
        _ => None,
    }
}

pub fn write_scene(path: &Path, scene: &Scene) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create scene file: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), scene)
        .context("Failed to serialize scene")?;
    Ok(())
}
