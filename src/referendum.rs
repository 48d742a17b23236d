//! Joining ballot records to their administrative area.
//!
//! Department codes are stored inconsistently across sources ("01" vs "1"),
//! so both sides are compared through the same normalized key. Codes with
//! the overseas prefix never take part in the join.

use std::collections::HashMap;

use log::{debug, info, warn};
use polars::prelude::*;

use crate::error::{ReferendumError, Result};
use crate::loader::require_columns;
use crate::schema::{areas, ballots, codes};

/// Temporary join key holding the normalized department code.
const DEP_KEY: &str = "__dep_key";

/// Normalized form of a department code column: surrounding whitespace and
/// leading zeros stripped. An all-zero code normalizes to "0".
pub fn normalized_code(column: &str) -> Expr {
    let trimmed = col(column).str().strip_chars(lit(" \t\r\n"));
    let stripped = trimmed.clone().str().strip_chars_start(lit("0"));
    when(stripped.clone().eq(lit("")).and(trimmed.eq(lit("")).not()))
        .then(lit("0"))
        .otherwise(stripped)
}

/// Plain-string counterpart of [`normalized_code`].
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// True for codes that belong to the mainland (not null, no overseas prefix).
fn is_mainland(column: &str) -> Expr {
    col(column).is_not_null().and(
        col(column)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .str()
            .starts_with(lit(codes::OVERSEAS_PREFIX))
            .not(),
    )
}

/// Each normalized key must identify exactly one area; "01" and "1" together
/// are an error.
fn check_unique_keys(keyed_areas: &DataFrame) -> Result<()> {
    let keys = keyed_areas.column(DEP_KEY)?.str()?;
    let codes = keyed_areas.column(areas::CODE_DEP)?.str()?;

    let mut seen: HashMap<&str, &str> = HashMap::new();
    for i in 0..keyed_areas.height() {
        let (Some(key), Some(code)) = (keys.get(i), codes.get(i)) else {
            continue;
        };
        if let Some(first) = seen.insert(key, code) {
            return Err(ReferendumError::InvalidData(format!(
                "Department codes '{first}' and '{code}' both normalize to '{key}'"
            )));
        }
    }
    Ok(())
}

/// Merge ballots with administrative areas.
///
/// Only mainland areas with a complete region are considered. Ballot rows
/// are kept only if their normalized department code is one of those areas'
/// normalized codes, then inner-joined to the area. Output columns: every
/// ballot column followed by code_reg, name_reg, code_dep, name_dep.
pub fn join_referendum(ballots_df: &DataFrame, areas_df: &DataFrame) -> Result<DataFrame> {
    require_columns(ballots_df, &[ballots::DEPARTMENT_CODE])?;
    require_columns(areas_df, &areas::ALL)?;

    let ballot_columns: Vec<String> = ballots_df
        .get_column_names_str()
        .iter()
        .map(|c| c.to_string())
        .collect();
    for name in areas::ALL {
        if ballot_columns.iter().any(|c| c == name) {
            return Err(ReferendumError::ColumnCollision {
                from: name.to_string(),
                to: name.to_string(),
            });
        }
    }

    let mainland_areas = areas_df
        .clone()
        .lazy()
        .filter(
            is_mainland(areas::CODE_DEP)
                .and(col(areas::CODE_REG).is_not_null())
                .and(col(areas::NAME_REG).is_not_null())
                .and(col(areas::NAME_DEP).is_not_null()),
        )
        .select([
            col(areas::CODE_REG),
            col(areas::NAME_REG),
            col(areas::CODE_DEP),
            col(areas::NAME_DEP),
            normalized_code(areas::CODE_DEP).alias(DEP_KEY),
        ])
        .collect()?;
    debug!(
        "{} of {} areas are mainland with a known region",
        mainland_areas.height(),
        areas_df.height()
    );

    check_unique_keys(&mainland_areas)?;

    let valid_keys = mainland_areas
        .column(DEP_KEY)?
        .as_materialized_series()
        .clone();

    let filtered = ballots_df
        .clone()
        .lazy()
        .filter(is_mainland(ballots::DEPARTMENT_CODE))
        .with_column(normalized_code(ballots::DEPARTMENT_CODE).alias(DEP_KEY))
        .filter(col(DEP_KEY).is_in(lit(valid_keys), false))
        .collect()?;

    let dropped = ballots_df.height() - filtered.height();
    if dropped > 0 {
        warn!("Dropped {dropped} ballot row(s) with an overseas or unmatched department code");
    }

    let mut output: Vec<Expr> = ballot_columns.iter().map(|c| col(c.as_str())).collect();
    output.extend(areas::ALL.iter().map(|&c| col(c)));

    let joined = filtered
        .lazy()
        .join(
            mainland_areas.lazy(),
            [col(DEP_KEY)],
            [col(DEP_KEY)],
            JoinArgs::new(JoinType::Inner),
        )
        .select(output)
        .collect()?;

    info!("Joined {} ballot rows to their areas", joined.height());
    Ok(joined)
}
