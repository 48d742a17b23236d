//! Configuration for a pipeline run and for the rendered map.

use std::path::PathBuf;

/// Configuration for the choropleth renderer.
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Width of the SVG canvas in pixels
    pub width_px: u32,
    /// Height of the SVG canvas in pixels
    pub height_px: u32,
    /// Inner margin kept free around the shapes
    pub margin_px: u32,
    /// Title rendered above the map
    pub title: String,
    /// Fill used for shapes whose value is missing
    pub missing_color: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width_px: 800,
            height_px: 800,
            margin_px: 20,
            title: "Rate of 'Choice A' over all expressed ballots".to_string(),
            missing_color: "#d9d9d9".to_string(),
        }
    }
}

/// Where the input tables live and where the map goes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the input file names are resolved against
    pub data_dir: PathBuf,
    pub ballots_file: String,
    pub regions_file: String,
    pub departments_file: String,
    pub geometry_file: String,
    /// Field delimiter of the ballots CSV (the other CSVs are comma-separated)
    pub ballots_delimiter: u8,
    /// Output path of the rendered map; `None` skips rendering
    pub map_output: Option<PathBuf>,
    pub map: MapConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ballots_file: "referendum.csv".to_string(),
            regions_file: "regions.csv".to_string(),
            departments_file: "departments.csv".to_string(),
            geometry_file: "regions.geojson".to_string(),
            ballots_delimiter: b';',
            map_output: Some(PathBuf::from("referendum_map.html")),
            map: MapConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn ballots_path(&self) -> PathBuf {
        self.data_dir.join(&self.ballots_file)
    }

    pub fn regions_path(&self) -> PathBuf {
        self.data_dir.join(&self.regions_file)
    }

    pub fn departments_path(&self) -> PathBuf {
        self.data_dir.join(&self.departments_file)
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.data_dir.join(&self.geometry_file)
    }
}
