//! Snow Today transforms.
//!
//! Each transform turns one upstream representation into the form the web
//! application serves:
//!
//! - Version-controlled reference JSON and plot JSON: validated and copied
//! - Region metadata JSON: matched to a schema by filename, validated, copied
//! - Region shapes: GeoJSON repaired where a known malformation is found
//! - GeoTIFFs: converted to Cloud-Optimized GeoTIFFs by an external tool
//! - SWE station CSV: converted to JSON
//! - Variable and colormap metadata: rendered to SVG legends
//!
//! All transforms implement [`Transform`], create missing destination
//! directories, and produce identical output when re-run on identical input.

mod cogs;
pub mod error;
mod files;
mod json;
mod legends;
mod regions;
mod swe;
mod transform;

pub use cogs::{CloudOptimize, COG_OPTIONS};
pub use error::{Result, TransformError};
pub use json::{PlotJson, ValidateAndCopyJson};
pub use legends::{render_legend_svg, Extend, LegendSpec, RegionLegends, SweLegends};
pub use regions::{fix_geojson, RegionMetadata, RegionShapes};
pub use swe::{
    parse_swe_csv, SweMetadata, SwePayload, SwePoint, SwePoints, SWE_CSV_HEADER, SWE_DATE_KEY,
};
pub use transform::{TaskInput, Transform};
