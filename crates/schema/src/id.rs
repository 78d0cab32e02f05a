//! Identifiers of validatable output data classes.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// A class of output JSON that has a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaId {
    ColormapsIndex,
    VariablesIndex,
    SuperRegionsIndex,
    SubRegionsIndex,
    SubRegionCollectionsIndex,
    SubRegionsHierarchy,
    SwePoints,
    Plots,
}

impl SchemaId {
    pub const ALL: [SchemaId; 8] = [
        Self::ColormapsIndex,
        Self::VariablesIndex,
        Self::SuperRegionsIndex,
        Self::SubRegionsIndex,
        Self::SubRegionCollectionsIndex,
        Self::SubRegionsHierarchy,
        Self::SwePoints,
        Self::Plots,
    ];

    /// The schemas that make up a region metadata drop.
    pub const REGION_METADATA: [SchemaId; 4] = [
        Self::SuperRegionsIndex,
        Self::SubRegionsIndex,
        Self::SubRegionCollectionsIndex,
        Self::SubRegionsHierarchy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColormapsIndex => "colormapsIndex",
            Self::VariablesIndex => "variablesIndex",
            Self::SuperRegionsIndex => "superRegionsIndex",
            Self::SubRegionsIndex => "subRegionsIndex",
            Self::SubRegionCollectionsIndex => "subRegionCollectionsIndex",
            Self::SubRegionsHierarchy => "subRegionsHierarchy",
            Self::SwePoints => "swePoints",
            Self::Plots => "plots",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|id| id.as_str()).collect()
    }

    /// Default filename pattern. Patterns are anchored and must be disjoint.
    pub fn default_pattern(&self) -> &'static str {
        match self {
            Self::ColormapsIndex => r"^colormaps\.json$",
            Self::VariablesIndex => r"^variables\.json$",
            Self::SuperRegionsIndex => r"^root\.json$",
            Self::SubRegionsIndex => r"^\d+\.json$",
            Self::SubRegionCollectionsIndex => r"^collections\.json$",
            Self::SubRegionsHierarchy => r"^\d+_hierarchy\.json$",
            Self::SwePoints => r"^swe\.json$",
            Self::Plots => r"^\d+_\d+\.json$",
        }
    }

    pub(crate) fn document(&self) -> &'static str {
        match self {
            Self::ColormapsIndex => include_str!("../schemas/colormapsIndex.json"),
            Self::VariablesIndex => include_str!("../schemas/variablesIndex.json"),
            Self::SuperRegionsIndex => include_str!("../schemas/superRegionsIndex.json"),
            Self::SubRegionsIndex => include_str!("../schemas/subRegionsIndex.json"),
            Self::SubRegionCollectionsIndex => {
                include_str!("../schemas/subRegionCollectionsIndex.json")
            }
            Self::SubRegionsHierarchy => include_str!("../schemas/subRegionsHierarchy.json"),
            Self::SwePoints => include_str!("../schemas/swePoints.json"),
            Self::Plots => include_str!("../schemas/plots.json"),
        }
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownSchema(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for id in SchemaId::ALL {
            assert_eq!(id.as_str().parse::<SchemaId>().unwrap(), id);
        }
        assert!("legends".parse::<SchemaId>().is_err());
    }
}
