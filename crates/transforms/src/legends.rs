//! SVG legend generation from variable and colormap metadata.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::{Result, TransformError};
use crate::files::{ensure_dir, write_text};
use crate::transform::{TaskInput, Transform};

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 64.0;
const MARGIN: f64 = 20.0;
const BAR_TOP: f64 = 8.0;
const BAR_HEIGHT: f64 = 20.0;
const TRIANGLE: f64 = 12.0;
const TICK: f64 = 4.0;
const FONT_SIZE: u32 = 11;

/// Layer types that get a legend.
const LEGEND_LAYER_TYPES: [&str; 2] = ["raster", "point_swe"];

/// Which ends of a colorbar get an overflow triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extend {
    Neither,
    Min,
    Max,
    Both,
}

impl Extend {
    /// Choose triangles for data that may fall outside the colormap range.
    ///
    /// A colormap starting at 1 with a transparent zero is treated as
    /// starting at 0, since zero is drawn (as transparent) rather than
    /// clipped.
    pub fn for_ranges(colormap_range: [f64; 2], data_range: [f64; 2], transparent_zero: bool) -> Self {
        let colormap_min = if colormap_range[0] == 1.0 && transparent_zero {
            0.0
        } else {
            colormap_range[0]
        };

        let left = data_range[0] < colormap_min;
        let right = data_range[1] > colormap_range[1];
        match (left, right) {
            (true, true) => Self::Both,
            (true, false) => Self::Min,
            (false, true) => Self::Max,
            (false, false) => Self::Neither,
        }
    }

    fn left(self) -> bool {
        matches!(self, Self::Min | Self::Both)
    }

    fn right(self) -> bool {
        matches!(self, Self::Max | Self::Both)
    }
}

/// Everything needed to draw one legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendSpec {
    /// 8-bit RGB or RGBA colors, lowest value first.
    pub colors: Vec<Vec<u8>>,
    pub colormap_range: [f64; 2],
    pub data_range: [f64; 2],
    pub label: String,
    pub transparent_zero: bool,
}

impl LegendSpec {
    pub fn extend(&self) -> Extend {
        Extend::for_ranges(self.colormap_range, self.data_range, self.transparent_zero)
    }
}

/// Render a horizontal colorbar legend as SVG.
///
/// Output depends only on `spec`, so re-rendering identical metadata yields
/// identical bytes.
pub fn render_legend_svg(spec: &LegendSpec) -> String {
    let extend = spec.extend();
    let bar_left = MARGIN + if extend.left() { TRIANGLE } else { 0.0 };
    let bar_right = WIDTH - MARGIN - if extend.right() { TRIANGLE } else { 0.0 };
    let bar_bottom = BAR_TOP + BAR_HEIGHT;
    let bar_middle = BAR_TOP + BAR_HEIGHT / 2.0;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
    ));
    svg.push_str(&format!(
        "  <g font-family=\"sans-serif\" font-size=\"{FONT_SIZE}\" text-anchor=\"middle\">\n"
    ));

    let count = spec.colors.len().max(1) as f64;
    let step = (bar_right - bar_left) / count;
    for (i, color) in spec.colors.iter().enumerate() {
        let x = bar_left + step * i as f64;
        svg.push_str(&format!(
            "    <rect x=\"{:.3}\" y=\"{BAR_TOP}\" width=\"{:.3}\" height=\"{BAR_HEIGHT}\" {}/>\n",
            x,
            step,
            fill(color)
        ));
    }

    if extend.left() {
        if let Some(first) = spec.colors.first() {
            svg.push_str(&format!(
                "    <polygon points=\"{:.3},{BAR_TOP} {:.3},{bar_bottom} {:.3},{bar_middle}\" {} stroke=\"black\" stroke-width=\"0.5\"/>\n",
                bar_left,
                bar_left,
                bar_left - TRIANGLE,
                fill(first)
            ));
        }
    }
    if extend.right() {
        if let Some(last) = spec.colors.last() {
            svg.push_str(&format!(
                "    <polygon points=\"{:.3},{BAR_TOP} {:.3},{bar_bottom} {:.3},{bar_middle}\" {} stroke=\"black\" stroke-width=\"0.5\"/>\n",
                bar_right,
                bar_right,
                bar_right + TRIANGLE,
                fill(last)
            ));
        }
    }

    svg.push_str(&format!(
        "    <rect x=\"{:.3}\" y=\"{BAR_TOP}\" width=\"{:.3}\" height=\"{BAR_HEIGHT}\" fill=\"none\" stroke=\"black\" stroke-width=\"0.5\"/>\n",
        bar_left,
        bar_right - bar_left
    ));

    for (x, value) in [(bar_left, spec.colormap_range[0]), (bar_right, spec.colormap_range[1])] {
        svg.push_str(&format!(
            "    <line x1=\"{x:.3}\" y1=\"{bar_bottom}\" x2=\"{x:.3}\" y2=\"{}\" stroke=\"black\" stroke-width=\"0.5\"/>\n",
            bar_bottom + TICK
        ));
        svg.push_str(&format!(
            "    <text x=\"{x:.3}\" y=\"{}\">{}</text>\n",
            bar_bottom + TICK + f64::from(FONT_SIZE),
            value
        ));
    }

    svg.push_str(&format!(
        "    <text x=\"{}\" y=\"{}\">{}</text>\n",
        WIDTH / 2.0,
        HEIGHT - 4.0,
        escape_xml(&spec.label)
    ));
    svg.push_str("  </g>\n</svg>\n");
    svg
}

fn fill(color: &[u8]) -> String {
    match color {
        [r, g, b, a] if *a < 255 => format!(
            "fill=\"rgb({r},{g},{b})\" fill-opacity=\"{:.3}\"",
            f64::from(*a) / 255.0
        ),
        [r, g, b, ..] => format!("fill=\"rgb({r},{g},{b})\""),
        _ => "fill=\"none\"".to_string(),
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct Colormap {
    colors: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variable {
    label_map_legend: String,
    layer_type: String,
    value_range: [f64; 2],
    colormap_value_range: Option<[f64; 2]>,
    colormap_id: u32,
    transparent_zero: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuperRegion {
    variables: BTreeMap<String, RegionVariable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionVariable {
    data_value_range: [f64; 2],
}

async fn read_index<T: DeserializeOwned>(path: &Path) -> Result<BTreeMap<String, T>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TransformError::io("read", path, e))?;
    serde_json::from_str(&text).map_err(|source| TransformError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn colors_for<'a>(
    colormaps: &'a BTreeMap<String, Colormap>,
    variable_id: &str,
    variable: &Variable,
    path: &Path,
) -> Result<&'a [Vec<u8>]> {
    let colormap = colormaps
        .get(&variable.colormap_id.to_string())
        .ok_or_else(|| {
            TransformError::unexpected(
                path,
                format!(
                    "variable {variable_id} refers to unknown colormap {}",
                    variable.colormap_id
                ),
            )
        })?;
    if colormap.colors.is_empty() {
        return Err(TransformError::unexpected(
            path,
            format!("colormap {} has no colors", variable.colormap_id),
        ));
    }
    Ok(&colormap.colors)
}

async fn write_legend(spec: &LegendSpec, output: &Path) -> Result<()> {
    write_text(output, &render_legend_svg(spec)).await?;
    debug!(to = %output.display(), extend = ?spec.extend(), "Legend generated");
    Ok(())
}

/// Legends for every region and variable pair of the surface-properties data.
///
/// The colormap range comes from the region's `dataValueRange` for the
/// variable, so the same variable may have a different legend per region.
pub struct RegionLegends;

#[async_trait]
impl Transform for RegionLegends {
    fn name(&self) -> &'static str {
        "region-legends"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let regions_path = input.get("regions")?;
        let variables_path = input.get("variables")?;
        let colormaps_path = input.get("colormaps")?;

        let regions: BTreeMap<String, SuperRegion> = read_index(regions_path).await?;
        let variables: BTreeMap<String, Variable> = read_index(variables_path).await?;
        let colormaps: BTreeMap<String, Colormap> = read_index(colormaps_path).await?;

        ensure_dir(to).await?;
        let mut written = 0usize;
        for (region_id, region) in &regions {
            for (variable_id, region_variable) in &region.variables {
                let variable = variables.get(variable_id).ok_or_else(|| {
                    TransformError::unexpected(
                        regions_path,
                        format!("region {region_id} refers to unknown variable {variable_id}"),
                    )
                })?;

                if !LEGEND_LAYER_TYPES.contains(&variable.layer_type.as_str()) {
                    debug!(
                        variable = %variable_id,
                        layer_type = %variable.layer_type,
                        "Layer type has no legend"
                    );
                    continue;
                }

                let spec = LegendSpec {
                    colors: colors_for(&colormaps, variable_id, variable, colormaps_path)?.to_vec(),
                    colormap_range: region_variable.data_value_range,
                    data_range: variable.value_range,
                    label: variable.label_map_legend.clone(),
                    transparent_zero: variable.transparent_zero,
                };
                write_legend(&spec, &to.join(format!("{region_id}_{variable_id}.svg"))).await?;
                written += 1;
            }
        }

        info!(count = written, to = %to.display(), "Region legends generated");
        Ok(())
    }
}

/// One legend per snow-water-equivalent variable.
pub struct SweLegends;

#[async_trait]
impl Transform for SweLegends {
    fn name(&self) -> &'static str {
        "swe-legends"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let variables_path = input.get("variables")?;
        let colormaps_path = input.get("colormaps")?;

        let variables: BTreeMap<String, Variable> = read_index(variables_path).await?;
        let colormaps: BTreeMap<String, Colormap> = read_index(colormaps_path).await?;

        ensure_dir(to).await?;
        for (variable_id, variable) in &variables {
            let colormap_range = variable.colormap_value_range.ok_or_else(|| {
                TransformError::unexpected(
                    variables_path,
                    format!("variable {variable_id} has no 'colormapValueRange'"),
                )
            })?;

            let spec = LegendSpec {
                colors: colors_for(&colormaps, variable_id, variable, colormaps_path)?.to_vec(),
                colormap_range,
                data_range: variable.value_range,
                label: variable.label_map_legend.clone(),
                transparent_zero: variable.transparent_zero,
            };
            write_legend(&spec, &to.join(format!("{variable_id}.svg"))).await?;
        }

        info!(count = variables.len(), to = %to.display(), "SWE legends generated");
        Ok(())
    }
}
