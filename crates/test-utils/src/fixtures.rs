//! Common test fixtures for ingest tests.
//!
//! Small but schema-valid versions of every upstream payload, plus the
//! known-bad variants the ingest must reject.

use serde_json::{json, Value};

/// Super-region used throughout the fixtures.
pub const SUPER_REGION_ID: &str = "26000";

/// Station CSV header line.
pub const SWE_HEADER: &str = "Name,Lat,Lon,Elev_m,SWE,normSWE,dSWE,State,HUC02,HUC04";

/// Last date with data written into [`swe_csv`].
pub const SWE_DATE: &str = "2024-01-15";

pub fn colormaps() -> Value {
    json!({
        "1": {"name": "snow_cover", "colors": [[255, 255, 255], [128, 128, 255], [0, 0, 255]]},
        "2": {"name": "albedo", "colors": [[40, 40, 40, 255], [230, 230, 230, 128]]}
    })
}

/// Surface-properties variables: two with legends, one without.
pub fn ssp_variables() -> Value {
    json!({
        "1": {
            "longName": "Snow cover percent",
            "labelMapLegend": "Snow cover (%)",
            "layerType": "raster",
            "valueRange": [0, 100],
            "colormapValueRange": [1, 100],
            "colormapId": 1,
            "transparentZero": true
        },
        "3": {
            "longName": "Albedo",
            "labelMapLegend": "Albedo",
            "layerType": "raster",
            "valueRange": [0, 100],
            "colormapValueRange": [20, 80],
            "colormapId": 2,
            "transparentZero": false
        },
        "9": {
            "longName": "Snow cover days",
            "labelMapLegend": "Days",
            "layerType": "raster_notprocessed",
            "valueRange": [0, 366],
            "colormapId": 1,
            "transparentZero": false
        }
    })
}

pub fn swe_variables() -> Value {
    json!({
        "1": {
            "longName": "Snow water equivalent",
            "labelMapLegend": "SWE (in)",
            "layerType": "point_swe",
            "valueRange": [0, 80],
            "colormapValueRange": [0, 40],
            "colormapId": 1,
            "transparentZero": false
        }
    })
}

/// `root.json`: one super-region with all three surface-properties variables.
pub fn super_regions() -> Value {
    json!({
        (SUPER_REGION_ID): {
            "longName": "Western United States",
            "shortName": "WesternUS",
            "variables": {
                "1": {"default": true, "dataValueRange": [1, 100]},
                "3": {"dataValueRange": [20, 80]},
                "9": {"dataValueRange": [0, 366]}
            }
        }
    })
}

/// `<superRegionId>.json`
pub fn sub_regions() -> Value {
    json!({
        "26001": {"longName": "Colorado", "shortName": "CO", "collectionId": "1"},
        "26002": {"longName": "Upper Colorado", "shortName": "HUC14", "collectionId": "2"}
    })
}

/// `collections.json`
pub fn collections() -> Value {
    json!({
        "1": {"longName": "States", "shortName": "state"},
        "2": {"longName": "Hydrologic units (level 2)", "shortName": "HUC2"}
    })
}

/// `<superRegionId>_hierarchy.json`, two levels deep.
pub fn hierarchy() -> Value {
    json!({
        "collections": {
            "2": {
                "regions": {
                    "26002": {
                        "collections": {
                            "1": {"regions": {"26001": {"collections": null}}}
                        }
                    }
                }
            }
        }
    })
}

/// `<regionId>_<variableId>.json`
pub fn plot() -> Value {
    json!({
        "metadata": {"minYear": 2001, "maxYear": 2023},
        "data": {
            "dayOfWaterYear": [1, 2, 3],
            "date": ["2023-10-01", "2023-10-02", "2023-10-03"],
            "yearToDate": [0.0, 0.5, null],
            "min": [0.0, 0.0, 0.0],
            "max": [10.0, 12.0, 14.0],
            "median": [2.0, 2.5, 3.0],
            "prc25": [1.0, 1.0, 1.5],
            "prc75": [4.0, 5.0, 6.0]
        }
    })
}

/// Plot payload missing its `median` column.
pub fn plot_missing_median() -> Value {
    let mut plot = plot();
    if let Some(data) = plot["data"].as_object_mut() {
        data.remove("median");
    }
    plot
}

/// Region shape whose `features` member is a single feature.
pub fn malformed_shape() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": {
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [0, 1], [0, 0]]]}
        }
    })
}

pub fn shape() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [2, 0], [0, 2], [0, 0]]]}
        }]
    })
}

/// Station CSV with a YAML preamble and two stations, one without data.
pub fn swe_csv() -> String {
    format!(
        "SnowToday Calculated SWE Summary Data: {SWE_DATE}\n\
         Source: NRCS SNOTEL\n\
         {SWE_HEADER}\n\
         NIWOT,40.05,-105.58,3021,5.2,88.1,0.1,USCO,HUC10,1019\n\
         BERTHOUD SUMMIT,39.80,-105.78,3444,NaN,NaN,NaN,USCO,HUC14,1401\n"
    )
}

/// Station CSV whose only row has an empty `Lon` column.
pub fn swe_csv_missing_lon() -> String {
    format!(
        "SnowToday Calculated SWE Summary Data: {SWE_DATE}\n\
         {SWE_HEADER}\n\
         NIWOT,40.05,,3021,5.2,88.1,0.1,USCO,HUC10,1019\n"
    )
}
