use crate::error::MapError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub categories: Vec<CategoryConfig>,
    pub marker: MarkerConfig,
    pub viewport: ViewportConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub geometry: PathBuf,
    pub data_csv: PathBuf,
    pub join_column_geometry: String,
    pub name_column_geometry: String,
    pub join_column_csv: String,
    pub name_column_csv: String,
    pub total_column: String,
}

/// One demographic category. Order in the config file is the classifier's
/// tie-break order. A category's count is the sum of its CSV columns.
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub name: String,
    pub color: String, // Hex code
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarkerConfig {
    /// Colors for the three population size tiers, largest first.
    pub tier_colors: [String; 3],
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub scene_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Schema misuse is fatal; catch it before any data loads.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.categories.is_empty() {
            return Err(MapError::NoCategories);
        }
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return Err(MapError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        [input]
        geometry = "data/us_states.geojson"
        data_csv = "data/acs5_2017_race_states.csv"
        join_column_geometry = "GEOID"
        name_column_geometry = "NAME"
        join_column_csv = "geoid"
        name_column_csv = "name"
        total_column = "total"

        [[categories]]
        name = "White"
        color = "#fbb4ae"
        columns = ["white_alone"]

        [[categories]]
        name = "Latino"
        color = "#b3cde3"
        columns = ["latino_alone"]

        [marker]
        tier_colors = ["#4682b4", "#E25098", "#990066"]

        [viewport]
        width = 960.0
        height = 600.0

        [output]
        scene_path = "output/scene.json"

        [server]
        port = 3000
    "##;

    #[test]
    fn parses_and_preserves_category_order() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let names: Vec<&str> = config.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["White", "Latino"]);
        assert_eq!(config.marker.tier_colors[0], "#4682b4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_category_schema() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.categories.clear();
        assert_eq!(config.validate(), Err(MapError::NoCategories));
    }

    #[test]
    fn rejects_degenerate_viewport() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.viewport.height = 0.0;
        assert!(matches!(
            config.validate(),
            Err(MapError::InvalidViewport { .. })
        ));
    }
}
