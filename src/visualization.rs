/// Visualization module: choropleth map of a value column over region shapes.
///
/// Produces a self-contained HTML string with an inline SVG:
/// - One path per region, built from its Polygon / MultiPolygon rings
/// - Equirectangular projection, longitude scaled by cos(mean latitude)
/// - Sequential green fill by value, grey for missing values
/// - Legend bar with the value range, and a hover tooltip per region
///
/// This module only reads the finished table; computing the values is the
/// job of `ratio::compute_ratio`.
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use polars::prelude::*;
use serde_json::Value as JSValue;

use crate::config::MapConfig;
use crate::error::{ReferendumError, Result};
use crate::loader::require_columns;
use crate::schema::{areas, geometry};

/// Stops of the sequential "Greens" colormap, light to dark.
const GREENS: [(u8, u8, u8); 9] = [
    (0xf7, 0xfc, 0xf5),
    (0xe5, 0xf5, 0xe0),
    (0xc7, 0xe9, 0xc0),
    (0xa1, 0xd9, 0x9b),
    (0x74, 0xc4, 0x76),
    (0x41, 0xab, 0x5d),
    (0x23, 0x8b, 0x45),
    (0x00, 0x6d, 0x2c),
    (0x00, 0x44, 0x1b),
];

const TITLE_HEIGHT_PX: f64 = 40.0;
const LEGEND_WIDTH_PX: f64 = 70.0;

// ── Intermediate data structures ────────────────────────────────────────────

type Ring = Vec<(f64, f64)>;

struct RegionShape {
    code: String,
    label: String,
    value: Option<f64>,
    rings: Vec<Ring>,
}

struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of(shapes: &[RegionShape]) -> Option<Self> {
        let mut points = shapes.iter().flat_map(|s| s.rings.iter().flatten());
        let &(x0, y0) = points.next()?;
        let mut b = Bounds {
            min_x: x0,
            max_x: x0,
            min_y: y0,
            max_y: y0,
        };
        for &(x, y) in points {
            b.min_x = b.min_x.min(x);
            b.max_x = b.max_x.max(x);
            b.min_y = b.min_y.min(y);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }
}

// ── Data extraction ─────────────────────────────────────────────────────────

fn extract_shapes(df: &DataFrame, value_column: &str) -> Result<Vec<RegionShape>> {
    require_columns(df, &[geometry::CODE, geometry::GEOMETRY, value_column])?;

    let codes = df.column(geometry::CODE)?.str()?;
    let shapes = df.column(geometry::GEOMETRY)?.str()?;
    let values = df
        .column(value_column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values = values.f64()?;
    let names = df
        .column(areas::NAME_REG)
        .ok()
        .and_then(|c| c.str().ok());

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let code = codes.get(i).unwrap_or("").to_string();
        let Some(raw) = shapes.get(i) else {
            warn!("Region {code} has no geometry; skipped");
            continue;
        };
        let label = names
            .and_then(|n| n.get(i))
            .map(|n| n.to_string())
            .unwrap_or_else(|| code.clone());
        let value = values.get(i).filter(|v| v.is_finite());
        let rings = parse_rings(&serde_json::from_str(raw)?)?;
        out.push(RegionShape {
            code,
            label,
            value,
            rings,
        });
    }
    Ok(out)
}

/// Outer and inner rings of a Polygon or MultiPolygon geometry.
fn parse_rings(geom: &JSValue) -> Result<Vec<Ring>> {
    let coords = &geom["coordinates"];
    match geom["type"].as_str() {
        Some("Polygon") => polygon_rings(coords),
        Some("MultiPolygon") => {
            let polygons = coords.as_array().ok_or_else(|| {
                ReferendumError::InvalidData("MultiPolygon without coordinates".into())
            })?;
            let mut rings = Vec::new();
            for polygon in polygons {
                rings.extend(polygon_rings(polygon)?);
            }
            Ok(rings)
        }
        other => Err(ReferendumError::InvalidData(format!(
            "Unsupported geometry type: {other:?}"
        ))),
    }
}

fn polygon_rings(coords: &JSValue) -> Result<Vec<Ring>> {
    let invalid = || ReferendumError::InvalidData("Malformed polygon coordinates".into());
    let rings = coords.as_array().ok_or_else(invalid)?;
    rings
        .iter()
        .map(|ring| -> Result<Ring> {
            ring.as_array()
                .ok_or_else(invalid)?
                .iter()
                .map(|pt| -> Result<(f64, f64)> {
                    let x = pt[0].as_f64().ok_or_else(invalid)?;
                    let y = pt[1].as_f64().ok_or_else(invalid)?;
                    Ok((x, y))
                })
                .collect()
        })
        .collect()
}

// ── Colors ──────────────────────────────────────────────────────────────────

/// Color of `t` in [0, 1] on the green scale, linearly interpolated between stops.
pub fn greens(t: f64) -> String {
    let t = t.clamp(0.0, 1.0) * (GREENS.len() - 1) as f64;
    let lo = t.floor() as usize;
    let hi = (lo + 1).min(GREENS.len() - 1);
    let frac = t - lo as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (r0, g0, b0) = GREENS[lo];
    let (r1, g1, b1) = GREENS[hi];
    format!("#{:02x}{:02x}{:02x}", mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

fn value_range(shapes: &[RegionShape]) -> Option<(f64, f64)> {
    shapes
        .iter()
        .filter_map(|s| s.value)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// ── HTML generation ─────────────────────────────────────────────────────────

/// Render a choropleth of `value_column` as a self-contained HTML document.
///
/// Required columns: code, geometry (GeoJSON string), the value column.
/// name_reg is used for tooltips when present.
pub fn render_choropleth(df: &DataFrame, value_column: &str, config: &MapConfig) -> Result<String> {
    let shapes = extract_shapes(df, value_column)?;
    debug!("Rendering {} region shapes", shapes.len());

    let width = config.width_px as f64;
    let height = config.height_px as f64;
    let margin = config.margin_px as f64;
    let range = value_range(&shapes);

    let mut body = String::new();
    if let Some(bounds) = Bounds::of(&shapes) {
        let mean_lat = (bounds.min_y + bounds.max_y) / 2.0;
        let x_scale_geo = mean_lat.to_radians().cos().max(1e-6);
        let geo_w = ((bounds.max_x - bounds.min_x) * x_scale_geo).max(1e-9);
        let geo_h = (bounds.max_y - bounds.min_y).max(1e-9);
        let avail_w = (width - 2.0 * margin - LEGEND_WIDTH_PX).max(1.0);
        let avail_h = (height - 2.0 * margin - TITLE_HEIGHT_PX).max(1.0);
        let scale = (avail_w / geo_w).min(avail_h / geo_h);
        let project = |(x, y): (f64, f64)| {
            (
                margin + (x - bounds.min_x) * x_scale_geo * scale,
                margin + TITLE_HEIGHT_PX + (bounds.max_y - y) * scale,
            )
        };

        for shape in &shapes {
            let fill = match (shape.value, range) {
                (Some(v), Some((lo, hi))) if hi > lo => greens((v - lo) / (hi - lo)),
                (Some(_), Some(_)) => greens(0.5),
                _ => config.missing_color.clone(),
            };
            let tooltip = match shape.value {
                Some(v) => format!("{} ({}): {:.4}", shape.label, shape.code, v),
                None => format!("{} ({}): no data", shape.label, shape.code),
            };
            let _ = write!(
                body,
                r##"<path data-code="{}" d="{}" fill="{}" stroke="black" stroke-width="0.5" fill-rule="evenodd"><title>{}</title></path>"##,
                escape_xml(&shape.code),
                rings_to_path(&shape.rings, &project),
                fill,
                escape_xml(&tooltip),
            );
            body.push('\n');
        }
    }

    let legend = legend_svg(
        range,
        width - LEGEND_WIDTH_PX + 10.0,
        margin + TITLE_HEIGHT_PX,
        height - 2.0 * margin - TITLE_HEIGHT_PX,
    );

    let html = format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 0; }}
path:hover {{ stroke-width: 2; }}
</style>
</head>
<body>
<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
<text x="{title_x}" y="{title_y}" text-anchor="middle" font-size="18">{title}</text>
{body}{legend}</svg>
</body>
</html>
"##,
        title = escape_xml(&config.title),
        width = config.width_px,
        height = config.height_px,
        title_x = width / 2.0,
        title_y = margin + TITLE_HEIGHT_PX / 2.0,
        body = body,
        legend = legend,
    );

    Ok(html)
}

fn rings_to_path(rings: &[Ring], project: &impl Fn((f64, f64)) -> (f64, f64)) -> String {
    let mut d = String::new();
    for ring in rings {
        for (j, &pt) in ring.iter().enumerate() {
            let (x, y) = project(pt);
            let _ = write!(d, "{}{:.2},{:.2}", if j == 0 { "M" } else { "L" }, x, y);
        }
        if !ring.is_empty() {
            d.push('Z');
        }
    }
    d
}

/// Vertical gradient bar, dark at the top (max) and light at the bottom (min).
fn legend_svg(range: Option<(f64, f64)>, x: f64, y: f64, h: f64) -> String {
    let Some((lo, hi)) = range else {
        return String::new();
    };
    let mut stops = String::new();
    for i in 0..GREENS.len() {
        let t = i as f64 / (GREENS.len() - 1) as f64;
        let _ = write!(
            stops,
            r##"<stop offset="{:.3}" stop-color="{}"/>"##,
            1.0 - t,
            greens(t)
        );
    }
    format!(
        r##"<defs><linearGradient id="legend" x1="0" y1="0" x2="0" y2="1">{stops}</linearGradient></defs>
<rect x="{x}" y="{y}" width="16" height="{h}" fill="url(#legend)" stroke="black" stroke-width="0.5"/>
<text x="{tx}" y="{top}" font-size="12">{hi:.3}</text>
<text x="{tx}" y="{bottom}" font-size="12">{lo:.3}</text>
"##,
        tx = x + 20.0,
        top = y + 10.0,
        bottom = y + h,
    )
}

pub fn write_choropleth(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html)?;
    info!("Wrote map to {}", path.display());
    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str =
        r#"{"type":"Polygon","coordinates":[[[0.0,45.0],[1.0,45.0],[1.0,46.0],[0.0,46.0],[0.0,45.0]]]}"#;
    const ISLANDS: &str = r#"{"type":"MultiPolygon","coordinates":[[[[2.0,45.0],[3.0,45.0],[3.0,46.0],[2.0,45.0]]],[[[4.0,45.0],[5.0,45.0],[5.0,46.0],[4.0,45.0]]]]}"#;

    fn geo_result() -> DataFrame {
        df!(
            "code" => ["1", "2", "3"],
            "name_reg" => [Some("Île-Test"), Some("Deux & Co"), None],
            "ratio" => [Some(0.25), Some(0.75), None],
            "geometry" => [SQUARE, ISLANDS, SQUARE],
        )
        .unwrap()
    }

    #[test]
    fn greens_scale_endpoints() {
        assert_eq!(greens(0.0), "#f7fcf5");
        assert_eq!(greens(1.0), "#00441b");
        assert_eq!(greens(-3.0), "#f7fcf5");
        assert_eq!(greens(7.0), "#00441b");
    }

    #[test]
    fn renders_one_path_per_shape_with_missing_in_grey() {
        let config = MapConfig::default();
        let html = render_choropleth(&geo_result(), "ratio", &config).unwrap();

        assert_eq!(html.matches("<path ").count(), 3);
        assert!(html.contains(r#"data-code="1""#));
        assert!(html.contains(&format!(r#"fill="{}""#, greens(0.0))));
        assert!(html.contains(&format!(r#"fill="{}""#, greens(1.0))));
        assert!(html.contains(&format!(r#"fill="{}""#, config.missing_color)));
        assert!(html.contains("Deux &amp; Co"));
        assert!(html.contains("3 (3): no data"));
        assert!(html.contains("Rate of &#39;Choice A&#39; over all expressed ballots"));
    }

    #[test]
    fn colors_and_legend_span_the_observed_range() {
        let html = render_choropleth(&geo_result(), "ratio", &MapConfig::default()).unwrap();
        assert!(html.contains(">0.750</text>"));
        assert!(html.contains(">0.250</text>"));
        assert!(!html.contains(">1.000</text>"));

        let single = df!(
            "code" => ["1"],
            "ratio" => [0.4],
            "geometry" => [SQUARE],
        )
        .unwrap();
        let html = render_choropleth(&single, "ratio", &MapConfig::default()).unwrap();
        assert!(html.contains(&format!(r#"fill="{}""#, greens(0.5))));
    }

    #[test]
    fn multipolygon_yields_one_subpath_per_ring() {
        let rings = parse_rings(&serde_json::from_str(ISLANDS).unwrap()).unwrap();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[1][0], (4.0, 45.0));
    }

    #[test]
    fn unsupported_geometry_is_invalid() {
        let point: JSValue = serde_json::from_str(r#"{"type":"Point","coordinates":[1.0,2.0]}"#).unwrap();
        assert!(matches!(
            parse_rings(&point),
            Err(ReferendumError::InvalidData(_))
        ));
    }

    #[test]
    fn missing_value_column_fails() {
        let err = render_choropleth(&geo_result(), "share", &MapConfig::default()).unwrap_err();
        assert!(matches!(err, ReferendumError::MissingColumn(c) if c == "share"));
    }

    #[test]
    fn writes_document_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        write_choropleth(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
