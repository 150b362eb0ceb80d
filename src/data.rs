use crate::config::AppConfig;
use crate::types::{DemographicRecord, RegionFeature};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::info;

/// Load both sources concurrently and wait for both before anything joins
/// or renders. Either failure aborts initialization; no partial scene.
pub async fn load_sources(
    config: &AppConfig,
) -> Result<(Vec<RegionFeature>, Vec<DemographicRecord>)> {
    let geometry_config = config.clone();
    let record_config = config.clone();

    let geometry_task = tokio::task::spawn_blocking(move || load_geometry(&geometry_config));
    let record_task = tokio::task::spawn_blocking(move || load_records(&record_config));

    let (features, records) = tokio::try_join!(geometry_task, record_task)?;
    let features = features?;
    let records = records?;

    info!(
        features = features.len(),
        records = records.len(),
        "data sources loaded"
    );
    Ok((features, records))
}

pub fn load_geometry(config: &AppConfig) -> Result<Vec<RegionFeature>> {
    let extension = config
        .input
        .geometry
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    match extension.as_str() {
        "shp" => load_shapefile(config),
        "json" | "geojson" => {
            let file = File::open(&config.input.geometry).with_context(|| {
                format!("Failed to open GeoJSON file: {:?}", config.input.geometry)
            })?;
            parse_geojson_features(BufReader::new(file), config)
        }
        _ => Err(anyhow!("Unsupported geometry format: {}", extension)),
    }
}

pub fn load_records(config: &AppConfig) -> Result<Vec<DemographicRecord>> {
    let file = File::open(&config.input.data_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", config.input.data_csv))?;
    parse_records(file, config)
}

/// Parse tabular records. Category counts come from the configured columns
/// (summed when a category maps to several); numeric parsing tolerates
/// blanks and text by reading them as zero, the way the original view's
/// auto-typing did.
pub fn parse_records<R: Read>(reader: R, config: &AppConfig) -> Result<Vec<DemographicRecord>> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let col_indices: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let join_idx = *col_indices
        .get(config.input.join_column_csv.as_str())
        .ok_or_else(|| {
            anyhow!(
                "Join column '{}' not found in CSV",
                config.input.join_column_csv
            )
        })?;
    let name_idx = *col_indices
        .get(config.input.name_column_csv.as_str())
        .ok_or_else(|| {
            anyhow!(
                "Name column '{}' not found in CSV",
                config.input.name_column_csv
            )
        })?;
    let total_idx = *col_indices
        .get(config.input.total_column.as_str())
        .ok_or_else(|| {
            anyhow!("Total column '{}' not found in CSV", config.input.total_column)
        })?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let id = canonical_id(row.get(join_idx).unwrap_or(""));
        if id.is_empty() {
            continue;
        }

        let mut counts = Vec::with_capacity(config.categories.len());
        for category in &config.categories {
            let mut sum = 0u64;
            for column in &category.columns {
                if let Some(&idx) = col_indices.get(column.as_str()) {
                    sum += parse_count(row.get(idx));
                }
            }
            counts.push(sum);
        }

        records.push(DemographicRecord {
            id,
            name: row.get(name_idx).unwrap_or("").to_string(),
            counts,
            total: parse_count(row.get(total_idx)),
        });
    }

    Ok(records)
}

pub fn parse_geojson_features<R: Read>(reader: R, config: &AppConfig) -> Result<Vec<RegionFeature>> {
    use geojson::GeoJson;

    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();
    for feature in collection.features {
        let props = feature.properties.as_ref();

        let id = match props.and_then(|p| p.get(&config.input.join_column_geometry)) {
            Some(serde_json::Value::String(s)) => canonical_id(s),
            Some(serde_json::Value::Number(n)) => canonical_id(&n.to_string()),
            _ => continue, // Skip if no ID or not string/number
        };
        if id.is_empty() {
            continue;
        }

        let name = props
            .and_then(|p| p.get(&config.input.name_column_geometry))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let geometry = match feature.geometry {
            Some(geom) => {
                let converted: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry for region {id}: {e:?}"))?;
                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        features.push(RegionFeature { id, name, geometry });
    }

    Ok(features)
}

fn load_shapefile(config: &AppConfig) -> Result<Vec<RegionFeature>> {
    let mut reader = Reader::from_path(&config.input.geometry)
        .with_context(|| format!("Failed to open Shapefile: {:?}", config.input.geometry))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let id = match record.get(&config.input.join_column_geometry) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => canonical_id(s),
            Some(shapefile::dbase::FieldValue::Numeric(Some(v))) => {
                canonical_id(&format!("{}", *v as i64))
            }
            _ => continue, // Skip if the join field is null or non-scalar
        };
        if id.is_empty() {
            continue;
        }

        let name = match record.get(&config.input.name_column_geometry) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.clone(),
            _ => String::new(),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue, // Skip non-polygon shapes
        };

        features.push(RegionFeature { id, name, geometry });
    }

    Ok(features)
}

/// Canonical form for region codes so both sources compare exactly: trim,
/// and strip leading zeros from all-digit ids ("01" and "1" are the same
/// code; the original view compared them after numeric coercion).
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        if stripped.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    } else {
        trimmed.to_string()
    }
}

fn parse_count(field: Option<&str>) -> u64 {
    let raw = field.unwrap_or("").trim();
    raw.parse::<u64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round().max(0.0) as u64))
        .unwrap_or(0)
}
