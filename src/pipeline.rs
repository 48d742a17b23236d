use log::info;
use polars::prelude::*;

use crate::aggregation::aggregate_by_region;
use crate::areas::merge_areas;
use crate::error::Result;
use crate::loader::Inputs;
use crate::ratio::compute_ratio;
use crate::referendum::join_referendum;

/// Every intermediate table of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub areas: DataFrame,
    pub joined: DataFrame,
    pub region_result: DataFrame,
    pub geo_result: DataFrame,
}

/// Run the stages in order: areas, ballot join, regional aggregation, ratio.
pub fn run_pipeline(inputs: &Inputs) -> Result<PipelineOutput> {
    let areas = merge_areas(&inputs.regions, &inputs.departments)?;
    let joined = join_referendum(&inputs.ballots, &areas)?;
    let region_result = aggregate_by_region(&joined)?;
    let geo_result = compute_ratio(&region_result, &inputs.geometry)?;
    info!(
        "Pipeline finished: {} regions with results, {} shapes",
        region_result.height(),
        geo_result.height()
    );

    Ok(PipelineOutput {
        areas,
        joined,
        region_result,
        geo_result,
    })
}
