//! Top-level categories of upstream data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// A category of upstream data with its own task catalog and live directory.
///
/// `Common` tags outputs that every runnable source re-ingests (e.g. the
/// colormaps index). It cannot be ingested on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    SnowSurfaceProperties,
    SnowWaterEquivalent,
    Common,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SnowSurfaceProperties => "snow-surface-properties",
            Self::SnowWaterEquivalent => "snow-water-equivalent",
            Self::Common => "common",
        }
    }

    /// Sources that can be ingested, in the order they're usually run.
    pub fn runnable() -> [DataSource; 2] {
        [Self::SnowSurfaceProperties, Self::SnowWaterEquivalent]
    }

    pub fn is_runnable(&self) -> bool {
        !matches!(self, Self::Common)
    }

    /// Whether a task tagged with `self` belongs to an ingest of `source`.
    pub fn applies_to(&self, source: DataSource) -> bool {
        *self == source || *self == Self::Common
    }

    /// Ensure this source can be ingested.
    pub fn require_runnable(self) -> Result<Self, CommonError> {
        if self.is_runnable() {
            Ok(self)
        } else {
            Err(CommonError::NotRunnable(self.as_str().to_string()))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snow-surface-properties" => Ok(Self::SnowSurfaceProperties),
            "snow-water-equivalent" => Ok(Self::SnowWaterEquivalent),
            "common" => Ok(Self::Common),
            other => Err(CommonError::UnknownDataSource(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for source in [
            DataSource::SnowSurfaceProperties,
            DataSource::SnowWaterEquivalent,
            DataSource::Common,
        ] {
            assert_eq!(source.as_str().parse::<DataSource>().unwrap(), source);
        }
    }

    #[test]
    fn test_unknown_source() {
        let err = "snow-depth".parse::<DataSource>().unwrap_err();
        assert_eq!(err, CommonError::UnknownDataSource("snow-depth".to_string()));
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&DataSource::SnowWaterEquivalent).unwrap();
        assert_eq!(json, "\"snow-water-equivalent\"");
    }

    #[test]
    fn test_common_applies_everywhere() {
        assert!(DataSource::Common.applies_to(DataSource::SnowSurfaceProperties));
        assert!(DataSource::Common.applies_to(DataSource::SnowWaterEquivalent));
        assert!(!DataSource::SnowWaterEquivalent.applies_to(DataSource::SnowSurfaceProperties));
    }

    #[test]
    fn test_common_not_runnable() {
        assert!(DataSource::Common.require_runnable().is_err());
        assert!(DataSource::runnable().iter().all(|s| s.is_runnable()));
    }
}
