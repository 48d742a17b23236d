use log::{info, warn};
use polars::prelude::*;

use crate::error::{ReferendumError, Result};
use crate::loader::require_columns;
use crate::schema::{areas, departments, regions};

/// Merge regions and departments into one administrative-area table.
///
/// Output columns: code_reg, name_reg, code_dep, name_dep. One row per
/// department; a department whose region code is unknown keeps its row with
/// a missing name_reg.
pub fn merge_areas(regions_df: &DataFrame, departments_df: &DataFrame) -> Result<DataFrame> {
    require_columns(regions_df, &[regions::CODE, regions::NAME])?;
    require_columns(
        departments_df,
        &[
            departments::CODE,
            departments::NAME,
            departments::REGION_CODE,
        ],
    )?;

    let regions_renamed = rename_columns(
        regions_df,
        &[(regions::CODE, areas::CODE_REG), (regions::NAME, areas::NAME_REG)],
    )?;
    let departments_renamed = rename_columns(
        departments_df,
        &[
            (departments::REGION_CODE, areas::CODE_REG),
            (departments::CODE, areas::CODE_DEP),
            (departments::NAME, areas::NAME_DEP),
        ],
    )?;

    let merged = departments_renamed
        .lazy()
        .select([
            col(areas::CODE_REG),
            col(areas::CODE_DEP),
            col(areas::NAME_DEP),
        ])
        .join(
            regions_renamed
                .lazy()
                .select([col(areas::CODE_REG), col(areas::NAME_REG)]),
            [col(areas::CODE_REG)],
            [col(areas::CODE_REG)],
            JoinArgs::new(JoinType::Left),
        )
        .select(areas::ALL.iter().map(|&c| col(c)).collect::<Vec<_>>())
        .collect()?;

    let unmatched = merged.column(areas::NAME_REG)?.null_count();
    if unmatched > 0 {
        warn!("{unmatched} department(s) reference an unknown region code");
    }
    info!("Merged {} administrative areas", merged.height());

    Ok(merged)
}

/// Rename columns, refusing to overwrite a column that is not itself renamed away.
fn rename_columns(df: &DataFrame, mapping: &[(&str, &str)]) -> Result<DataFrame> {
    let schema = df.schema();
    for &(from, to) in mapping {
        let renamed_away = mapping.iter().any(|&(other, _)| other == to);
        if from != to && schema.contains(to) && !renamed_away {
            return Err(ReferendumError::ColumnCollision {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
    }

    let old: Vec<&str> = mapping.iter().map(|&(from, _)| from).collect();
    let new: Vec<&str> = mapping.iter().map(|&(_, to)| to).collect();
    Ok(df.clone().lazy().rename(old, new, true).collect()?)
}
