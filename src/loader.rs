//! Reading the raw input tables from disk.
//!
//! Every CSV is read with all columns typed as strings; only the ballot
//! tallies are cast afterwards. Department and region codes keep their
//! leading zeros here; the joiner normalizes them.

use std::fs;
use std::path::Path;

use log::{debug, info};
use polars::prelude::*;
use serde_json::Value as JSValue;

use crate::config::PipelineConfig;
use crate::error::{ReferendumError, Result};
use crate::schema::{ballots, departments, geometry, regions};

/// The four raw tables the pipeline consumes.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub ballots: DataFrame,
    pub regions: DataFrame,
    pub departments: DataFrame,
    pub geometry: DataFrame,
}

pub fn load_inputs(config: &PipelineConfig) -> Result<Inputs> {
    Ok(Inputs {
        ballots: load_ballots(&config.ballots_path(), config.ballots_delimiter)?,
        regions: load_regions(&config.regions_path())?,
        departments: load_departments(&config.departments_path())?,
        geometry: load_geometry(&config.geometry_path())?,
    })
}

/// Load any CSV into a DataFrame with all columns as strings.
pub fn read_csv_as_strings(path: &Path, delimiter: u8) -> Result<DataFrame> {
    debug!("Reading {}", path.display());
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|opts| opts.with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(ReferendumError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Load the ballots CSV.
///
/// Required columns: Department code, Registered, Abstentions, Null,
/// Choice A, Choice B. The tallies are parsed to Int64; a value that is not
/// an integer fails the load. All other columns are kept as strings.
pub fn load_ballots(path: &Path, delimiter: u8) -> Result<DataFrame> {
    let raw = read_csv_as_strings(path, delimiter)?;
    require_columns(&raw, &[ballots::DEPARTMENT_CODE])?;
    require_columns(&raw, &ballots::COUNTS)?;

    let df = parse_counts(raw).map_err(|e| {
        ReferendumError::InvalidData(format!("{}: {e}", path.display()))
    })?;
    info!("Loaded {} ballot rows from {}", df.height(), path.display());
    Ok(df)
}

/// Cast the tally columns from strings to Int64, failing on any non-integer.
pub fn parse_counts(df: DataFrame) -> Result<DataFrame> {
    let casts: Vec<Expr> = ballots::COUNTS
        .iter()
        .map(|&name| {
            col(name)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .strict_cast(DataType::Int64)
        })
        .collect();
    Ok(df.lazy().with_columns(casts).collect()?)
}

pub fn load_regions(path: &Path) -> Result<DataFrame> {
    let df = read_csv_as_strings(path, b',')?;
    require_columns(&df, &[regions::CODE, regions::NAME])?;
    info!("Loaded {} regions from {}", df.height(), path.display());
    Ok(df)
}

pub fn load_departments(path: &Path) -> Result<DataFrame> {
    let df = read_csv_as_strings(path, b',')?;
    require_columns(
        &df,
        &[
            departments::CODE,
            departments::NAME,
            departments::REGION_CODE,
        ],
    )?;
    info!("Loaded {} departments from {}", df.height(), path.display());
    Ok(df)
}

/// Load region boundaries from a GeoJSON FeatureCollection.
///
/// Produces one row per feature: code, name, geometry (the feature's
/// geometry object serialized as a JSON string).
pub fn load_geometry(path: &Path) -> Result<DataFrame> {
    let contents = fs::read_to_string(path)?;
    let df = parse_geometry(&contents)?;
    info!("Loaded {} region shapes from {}", df.height(), path.display());
    Ok(df)
}

pub fn parse_geometry(contents: &str) -> Result<DataFrame> {
    let js: JSValue = serde_json::from_str(contents)?;
    let features = js["features"].as_array().ok_or_else(|| {
        ReferendumError::InvalidData("GeoJSON has no 'features' array".to_string())
    })?;

    let mut codes: Vec<String> = Vec::with_capacity(features.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(features.len());
    let mut shapes: Vec<Option<String>> = Vec::with_capacity(features.len());

    for (i, feature) in features.iter().enumerate() {
        let props = &feature["properties"];
        let code = property_as_string(&props["code"]).ok_or_else(|| {
            ReferendumError::InvalidData(format!("Feature {i} has no 'code' property"))
        })?;
        let name =
            property_as_string(&props["nom"]).or_else(|| property_as_string(&props["name"]));
        let shape = match &feature["geometry"] {
            JSValue::Null => None,
            g => Some(serde_json::to_string(g)?),
        };
        codes.push(code);
        names.push(name);
        shapes.push(shape);
    }

    let df = DataFrame::new(vec![
        Column::new(geometry::CODE.into(), &codes),
        Column::new(geometry::NAME.into(), &names),
        Column::new(geometry::GEOMETRY.into(), &shapes),
    ])?;
    Ok(df)
}

fn property_as_string(value: &JSValue) -> Option<String> {
    match value {
        JSValue::String(s) => Some(s.trim().to_string()),
        JSValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
