//! Referendum results aggregated by region, with a choropleth of the
//! Choice A share.
//!
//! Stages, in order: [`areas::merge_areas`], [`referendum::join_referendum`],
//! [`aggregation::aggregate_by_region`], [`ratio::compute_ratio`]. Each takes
//! its input frames explicitly and returns a new frame.

pub mod aggregation;
pub mod areas;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod ratio;
pub mod referendum;
pub mod schema;
pub mod visualization;

pub use config::{MapConfig, PipelineConfig};
pub use error::{ReferendumError, Result};
pub use loader::{load_inputs, Inputs};
pub use pipeline::{run_pipeline, PipelineOutput};
