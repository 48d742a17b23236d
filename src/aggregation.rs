use log::{info, warn};
use polars::prelude::*;

use crate::error::Result;
use crate::loader::require_columns;
use crate::schema::{areas, ballots};

/// Per-group reduction applied by [`aggregate_by_region`].
#[derive(Debug, Clone)]
pub enum AggKind {
    /// Keep the first value seen in the group, in input row order.
    First { column: String },
    /// Exact integer sum of each column.
    Sum { columns: Vec<String> },
}

impl AggKind {
    fn exprs(&self) -> Vec<Expr> {
        match self {
            Self::First { column } => vec![col(column.as_str()).first()],
            Self::Sum { columns } => columns.iter().map(|c| col(c.as_str()).sum()).collect(),
        }
    }
}

/// The reductions producing a RegionResult: the region name and the five tallies.
pub fn region_aggregations() -> Vec<AggKind> {
    vec![
        AggKind::First {
            column: areas::NAME_REG.to_string(),
        },
        AggKind::Sum {
            columns: ballots::COUNTS.iter().map(|c| c.to_string()).collect(),
        },
    ]
}

const NAME_VARIANTS: &str = "__name_variants";

/// Aggregate joined ballots by region.
///
/// Output columns: code_reg (the unique key, sorted), name_reg, Registered,
/// Abstentions, Null, Choice A, Choice B. Regions without any joined ballot
/// do not appear. When a region's rows disagree on name_reg, the first row's
/// name wins.
pub fn aggregate_by_region(joined: &DataFrame) -> Result<DataFrame> {
    require_columns(joined, &[areas::CODE_REG, areas::NAME_REG])?;
    require_columns(joined, &ballots::COUNTS)?;

    let mut aggs: Vec<Expr> = region_aggregations().iter().flat_map(AggKind::exprs).collect();
    aggs.push(col(areas::NAME_REG).n_unique().alias(NAME_VARIANTS));

    let grouped = joined
        .clone()
        .lazy()
        .group_by_stable([col(areas::CODE_REG)])
        .agg(aggs)
        .sort([areas::CODE_REG], SortMultipleOptions::default())
        .collect()?;

    let variants = grouped.column(NAME_VARIANTS)?.as_materialized_series().u32()?;
    let codes = grouped.column(areas::CODE_REG)?.str()?;
    for i in 0..grouped.height() {
        if variants.get(i).unwrap_or(0) > 1 {
            warn!(
                "Region {} has inconsistent names; keeping the first",
                codes.get(i).unwrap_or("<null>")
            );
        }
    }

    let mut output = vec![col(areas::CODE_REG), col(areas::NAME_REG)];
    output.extend(ballots::COUNTS.iter().map(|&c| col(c)));
    let result = grouped.lazy().select(output).collect()?;

    info!("Aggregated results for {} regions", result.height());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined() -> DataFrame {
        df!(
            "Department code" => ["1", "02", "59", "62"],
            "Registered" => [100i64, 50, 80, 70],
            "Abstentions" => [20i64, 10, 30, 10],
            "Null" => [5i64, 0, 2, 3],
            "Choice A" => [40i64, 20, 18, 27],
            "Choice B" => [35i64, 20, 30, 30],
            "code_reg" => ["1", "1", "32", "32"],
            "name_reg" => ["Île-Test", "Île-Test", "Hauts-Test", "Hauts-Test"],
            "code_dep" => ["01", "02", "59", "62"],
            "name_dep" => ["Un", "Deux", "Nord", "Pas-de-Calais"],
        )
        .unwrap()
    }

    fn value(df: &DataFrame, column: &str, row: usize) -> i64 {
        df.column(column).unwrap().i64().unwrap().get(row).unwrap()
    }

    #[test]
    fn sums_tallies_per_region() {
        let result = aggregate_by_region(&joined()).unwrap();

        assert_eq!(
            result.get_column_names_str(),
            vec![
                "code_reg",
                "name_reg",
                "Registered",
                "Abstentions",
                "Null",
                "Choice A",
                "Choice B"
            ]
        );
        assert_eq!(result.height(), 2);

        let codes = result.column(areas::CODE_REG).unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("1"));
        assert_eq!(value(&result, "Registered", 0), 150);
        assert_eq!(value(&result, "Abstentions", 0), 30);
        assert_eq!(value(&result, "Null", 0), 5);
        assert_eq!(value(&result, "Choice A", 0), 60);
        assert_eq!(value(&result, "Choice B", 0), 55);

        assert_eq!(codes.get(1), Some("32"));
        assert_eq!(value(&result, "Registered", 1), 150);
        assert_eq!(value(&result, "Choice A", 1), 45);
    }

    #[test]
    fn region_codes_are_unique() {
        let result = aggregate_by_region(&joined()).unwrap();
        let codes = result.column(areas::CODE_REG).unwrap().as_materialized_series();
        assert_eq!(codes.n_unique().unwrap(), result.height());
    }

    #[test]
    fn totals_stay_within_registered() {
        let result = aggregate_by_region(&joined()).unwrap();
        for row in 0..result.height() {
            let cast = value(&result, "Choice A", row)
                + value(&result, "Choice B", row)
                + value(&result, "Null", row)
                + value(&result, "Abstentions", row);
            assert!(cast <= value(&result, "Registered", row));
        }
    }

    #[test]
    fn first_name_wins_on_inconsistent_names() {
        let df = df!(
            "code_reg" => ["7", "7"],
            "name_reg" => ["Premier", "Second"],
            "Registered" => [10i64, 10],
            "Abstentions" => [1i64, 1],
            "Null" => [0i64, 0],
            "Choice A" => [5i64, 5],
            "Choice B" => [4i64, 4],
        )
        .unwrap();
        let result = aggregate_by_region(&df).unwrap();
        assert_eq!(result.height(), 1);
        let names = result.column(areas::NAME_REG).unwrap().str().unwrap();
        assert_eq!(names.get(0), Some("Premier"));
        assert_eq!(value(&result, "Registered", 0), 20);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let empty = joined().head(Some(0));
        let result = aggregate_by_region(&empty).unwrap();
        assert_eq!(result.height(), 0);
        assert_eq!(result.width(), 7);
    }
}
