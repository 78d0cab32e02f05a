//! Snow-water-equivalent station CSV to point JSON.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use schema::{SchemaId, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, TransformError};
use crate::files::{list_files, write_json};
use crate::transform::{TaskInput, Transform};

/// The exact column header line of the station CSV.
pub const SWE_CSV_HEADER: &str = "Name,Lat,Lon,Elev_m,SWE,normSWE,dSWE,State,HUC02,HUC04";

/// Preamble key holding the last date with data.
pub const SWE_DATE_KEY: &str = "SnowToday Calculated SWE Summary Data";

const OUTPUT_FILENAME: &str = "swe.json";

/// One CSV row as read. Columns not listed are dropped.
#[derive(Debug, Deserialize)]
struct SweRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Lat")]
    lat: String,
    #[serde(rename = "Lon")]
    lon: String,
    #[serde(rename = "Elev_m")]
    elevation: String,
    #[serde(rename = "SWE")]
    swe: String,
    #[serde(rename = "normSWE")]
    swe_normalized: String,
    #[serde(rename = "dSWE")]
    swe_delta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwePoint {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub elevation_meters: f64,
    pub swe_inches: Option<f64>,
    pub swe_normalized_pct: Option<f64>,
    pub swe_delta_inches: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweMetadata {
    pub last_date_with_data: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwePayload {
    pub metadata: SweMetadata,
    pub data: Vec<SwePoint>,
}

/// Convert the single station CSV in a directory to `swe.json`.
pub struct SwePoints {
    registry: Arc<SchemaRegistry>,
}

impl SwePoints {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Transform for SwePoints {
    fn name(&self) -> &'static str {
        "swe-points"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;
        let files = list_files(from, "txt")?;
        if files.len() != 1 {
            return Err(TransformError::UnexpectedInputCount {
                path: from.to_path_buf(),
                pattern: "*.txt".to_string(),
                expected: 1,
                files,
            });
        }
        let csv_path = &files[0];
        info!(from = %csv_path.display(), "Generating SWE JSON");

        let text = tokio::fs::read_to_string(csv_path)
            .await
            .map_err(|e| TransformError::io("read", csv_path, e))?;
        let payload = parse_swe_csv(&text, csv_path)?;
        debug!(points = payload.data.len(), "Parsed stations");

        let value = serde_json::to_value(&payload).map_err(|source| TransformError::Serialize {
            path: csv_path.clone(),
            source,
        })?;
        self.registry
            .validate(SchemaId::SwePoints, &value, OUTPUT_FILENAME)?;

        let output = to.join(OUTPUT_FILENAME);
        write_json(&output, &value).await?;
        info!(to = %output.display(), points = payload.data.len(), "SWE JSON written");
        Ok(())
    }
}

/// Parse station CSV text with its metadata preamble.
pub fn parse_swe_csv(text: &str, path: &Path) -> Result<SwePayload> {
    let (preamble, table) = split_at_header(text, SWE_CSV_HEADER, path)?;
    let metadata = parse_preamble(&preamble, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(table.as_bytes());

    let mut data = Vec::new();
    for (index, row) in reader.deserialize::<SweRow>().enumerate() {
        let row = row.map_err(|source| TransformError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        data.push(normalize_row(row, index + 1, path)?);
    }
    data.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(SwePayload { metadata, data })
}

/// Split `text` at the exact `header` line into (preamble, header + rows).
fn split_at_header(text: &str, header: &str, path: &Path) -> Result<(String, String)> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let header_lines: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim_end_matches(['\n', '\r']) == header)
        .map(|(i, _)| i)
        .collect();

    match header_lines.as_slice() {
        [] => Err(TransformError::MissingHeader {
            path: path.to_path_buf(),
            header: header.to_string(),
        }),
        [index] => Ok((lines[..*index].concat(), lines[*index..].concat())),
        _ => Err(TransformError::DuplicateHeader {
            path: path.to_path_buf(),
            lines: header_lines,
        }),
    }
}

fn parse_preamble(preamble: &str, path: &Path) -> Result<SweMetadata> {
    let preamble_error = |message: String| TransformError::Preamble {
        path: path.to_path_buf(),
        message,
    };

    let value: serde_yaml::Value =
        serde_yaml::from_str(preamble).map_err(|e| preamble_error(e.to_string()))?;
    let date = value
        .get(SWE_DATE_KEY)
        .ok_or_else(|| preamble_error(format!("missing key '{SWE_DATE_KEY}'")))?;
    let date = date
        .as_str()
        .ok_or_else(|| preamble_error(format!("'{SWE_DATE_KEY}' is not a date: {date:?}")))?;
    let last_date_with_data = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| preamble_error(format!("'{SWE_DATE_KEY}' is not a YYYY-MM-DD date: {e}")))?;

    Ok(SweMetadata {
        last_date_with_data,
    })
}

fn normalize_row(row: SweRow, index: usize, path: &Path) -> Result<SwePoint> {
    let required = |column: &'static str, value: &str| -> Result<f64> {
        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(TransformError::InvalidField {
                path: path.to_path_buf(),
                row: index,
                column,
                value: value.to_string(),
            }),
        }
    };
    let optional = |column: &'static str, value: &str| -> Result<Option<f64>> {
        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_nan() => Ok(None),
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(TransformError::InvalidField {
                path: path.to_path_buf(),
                row: index,
                column,
                value: value.to_string(),
            }),
        }
    };

    Ok(SwePoint {
        name: title_case(&row.name),
        lon: required("Lon", &row.lon)?,
        lat: required("Lat", &row.lat)?,
        elevation_meters: required("Elev_m", &row.elevation)?,
        swe_inches: optional("SWE", &row.swe)?,
        swe_normalized_pct: optional("normSWE", &row.swe_normalized)?,
        swe_delta_inches: optional("dSWE", &row.swe_delta)?,
    })
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
SnowToday Calculated SWE Summary Data: 2024-01-15
Source: SNOTEL
Name,Lat,Lon,Elev_m,SWE,normSWE,dSWE,State,HUC02,HUC04
NIWOT RIDGE,40.05,-105.58,3021,5.2,88.1,0.1,USCO,HUC10,1019
ber mountain,40.10,-105.60,2900,NaN,NaN,NaN,USCO,N/A,N/A
";

    #[test]
    fn test_parse_sorts_and_normalizes() {
        let payload = parse_swe_csv(CSV, Path::new("swe.txt")).unwrap();

        assert_eq!(
            payload.metadata.last_date_with_data,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        let names: Vec<&str> = payload.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ber Mountain", "Niwot Ridge"]);

        let ber = &payload.data[0];
        assert_eq!(ber.lon, -105.60);
        assert_eq!(ber.swe_inches, None);
        assert_eq!(ber.swe_normalized_pct, None);
        assert_eq!(payload.data[1].swe_delta_inches, Some(0.1));
    }

    #[test]
    fn test_serializes_camel_case_with_nulls() {
        let payload = parse_swe_csv(CSV, Path::new("swe.txt")).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["metadata"]["lastDateWithData"], "2024-01-15");
        assert!(value["data"][0]["sweInches"].is_null());
        assert_eq!(value["data"][1]["elevationMeters"], 3021.0);
        assert!(value["data"][0].get("State").is_none());
    }

    #[test]
    fn test_missing_header() {
        let err = parse_swe_csv("a: 1\nName,Lat\n", Path::new("swe.txt")).unwrap_err();
        assert!(matches!(err, TransformError::MissingHeader { .. }));
    }

    #[test]
    fn test_duplicate_header() {
        let text = format!("{SWE_DATE_KEY}: 2024-01-15\n{SWE_CSV_HEADER}\n{SWE_CSV_HEADER}\n");
        let err = parse_swe_csv(&text, Path::new("swe.txt")).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateHeader { ref lines, .. } if lines == &[1, 2]));
    }

    #[test]
    fn test_missing_date_key() {
        let text = format!("Other: 1\n{SWE_CSV_HEADER}\n");
        let err = parse_swe_csv(&text, Path::new("swe.txt")).unwrap_err();
        assert!(matches!(err, TransformError::Preamble { .. }));
    }

    #[test]
    fn test_missing_lon_is_invalid() {
        let text = format!(
            "{SWE_DATE_KEY}: 2024-01-15\n{SWE_CSV_HEADER}\nA,40.0,,3000,1,1,1,USCO,HUC10,1019\n"
        );
        let err = parse_swe_csv(&text, Path::new("swe.txt")).unwrap_err();
        assert!(
            matches!(err, TransformError::InvalidField { column: "Lon", row: 1, .. }),
            "{err}"
        );
    }

    #[test]
    fn test_crlf_header_is_found() {
        let text = format!("{SWE_DATE_KEY}: 2024-01-15\r\n{SWE_CSV_HEADER}\r\nA,40,-105,3000,1,2,3,USCO,HUC10,1019\r\n");
        let payload = parse_swe_csv(&text, Path::new("swe.txt")).unwrap();
        assert_eq!(payload.data.len(), 1);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("LAKE ELDORA"), "Lake Eldora");
        assert_eq!(title_case("o'brien #2"), "O'Brien #2");
    }
}
