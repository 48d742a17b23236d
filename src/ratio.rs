use log::{debug, info};
use polars::prelude::*;

use crate::error::Result;
use crate::loader::require_columns;
use crate::schema::{areas, ballots, geometry, result};

/// Share of expressed ballots going to Choice A.
///
/// Missing when Choice A + Choice B is zero or when either count is missing.
pub fn ratio_expr() -> Expr {
    let choice_a = col(ballots::CHOICE_A).cast(DataType::Float64);
    let choice_b = col(ballots::CHOICE_B).cast(DataType::Float64);
    let expressed = choice_a.clone() + choice_b;
    when(expressed.clone().eq(lit(0.0)))
        .then(lit(NULL).cast(DataType::Float64))
        .otherwise(choice_a / expressed)
        .alias(result::RATIO)
}

/// Attach region results to their shapes and compute the Choice A ratio.
///
/// Every shape is kept; a shape without results carries missing counts and
/// a missing ratio. Output columns: code, name_reg, Registered, Abstentions,
/// Null, Choice A, Choice B, ratio, geometry.
pub fn compute_ratio(region_result: &DataFrame, geometry_df: &DataFrame) -> Result<DataFrame> {
    require_columns(geometry_df, &[geometry::CODE, geometry::GEOMETRY])?;
    require_columns(region_result, &[areas::CODE_REG, areas::NAME_REG])?;
    require_columns(region_result, &ballots::COUNTS)?;

    let mut output = vec![col(geometry::CODE), col(areas::NAME_REG)];
    output.extend(ballots::COUNTS.iter().map(|&c| col(c)));
    output.push(ratio_expr());
    output.push(col(geometry::GEOMETRY));

    let df = geometry_df
        .clone()
        .lazy()
        .select([col(geometry::CODE), col(geometry::GEOMETRY)])
        .join(
            region_result.clone().lazy(),
            [col(geometry::CODE)],
            [col(areas::CODE_REG)],
            JoinArgs::new(JoinType::Left),
        )
        .select(output)
        .collect()?;

    let undefined = df.column(result::RATIO)?.null_count();
    debug!("{undefined} shape(s) without a defined ratio");
    info!("Computed ratio for {} region shapes", df.height());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_result() -> DataFrame {
        df!(
            "code_reg" => ["1", "2"],
            "name_reg" => ["Île-Test", "Vide-Test"],
            "Registered" => [150i64, 10],
            "Abstentions" => [30i64, 10],
            "Null" => [5i64, 0],
            "Choice A" => [60i64, 0],
            "Choice B" => [55i64, 0],
        )
        .unwrap()
    }

    fn shapes() -> DataFrame {
        df!(
            "code" => ["1", "2", "3"],
            "name" => ["Île-Test", "Vide-Test", "Sans-Vote"],
            "geometry" => [r#"{"type":"Polygon","coordinates":[]}"#; 3],
        )
        .unwrap()
    }

    fn ratio_of(df: &DataFrame, code: &str) -> Option<f64> {
        let codes = df.column(geometry::CODE).unwrap().str().unwrap();
        let ratios = df.column(result::RATIO).unwrap().f64().unwrap();
        let row = (0..df.height())
            .find(|&i| codes.get(i) == Some(code))
            .expect("code present");
        ratios.get(row)
    }

    #[test]
    fn ratio_is_share_of_expressed_ballots() {
        let geo = compute_ratio(&region_result(), &shapes()).unwrap();
        let ratio = ratio_of(&geo, "1").unwrap();
        assert!((ratio - 60.0 / 115.0).abs() < 1e-12);
    }

    #[test]
    fn zero_expressed_ballots_give_missing_ratio() {
        let geo = compute_ratio(&region_result(), &shapes()).unwrap();
        assert_eq!(ratio_of(&geo, "2"), None);
    }

    #[test]
    fn every_shape_is_kept() {
        let geo = compute_ratio(&region_result(), &shapes()).unwrap();
        assert_eq!(geo.height(), 3);
        assert_eq!(ratio_of(&geo, "3"), None);
        assert_eq!(
            geo.get_column_names_str(),
            vec![
                "code",
                "name_reg",
                "Registered",
                "Abstentions",
                "Null",
                "Choice A",
                "Choice B",
                "ratio",
                "geometry"
            ]
        );
    }

    #[test]
    fn ratio_stays_in_unit_interval() {
        let results = df!(
            "code_reg" => ["1", "2", "3"],
            "name_reg" => ["A", "B", "C"],
            "Registered" => [10i64, 10, 10],
            "Abstentions" => [0i64, 0, 0],
            "Null" => [0i64, 0, 0],
            "Choice A" => [0i64, 7, 9],
            "Choice B" => [9i64, 2, 0],
        )
        .unwrap();
        let geo = compute_ratio(&results, &shapes()).unwrap();
        for code in ["1", "2", "3"] {
            let r = ratio_of(&geo, code).unwrap();
            assert!((0.0..=1.0).contains(&r), "{code}: {r}");
        }
        assert_eq!(ratio_of(&geo, "1"), Some(0.0));
        assert_eq!(ratio_of(&geo, "3"), Some(1.0));
    }
}
