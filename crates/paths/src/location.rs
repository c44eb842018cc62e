//! # Resource Location
//!
//! Global vs regional placement of a Secret Manager or Parameter Manager resource.

use std::fmt;

/// Where a resource lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// Global namespace (`projects/P/secrets/S`, `locations/global` for parameters)
    Global,
    /// Bound to a single region, e.g. `us-central1`
    Regional(String),
}

impl Location {
    /// Value used in `locations/{..}` segments and `--location` flags
    pub fn as_str(&self) -> &str {
        match self {
            Location::Global => "global",
            Location::Regional(region) => region,
        }
    }

    pub fn is_regional(&self) -> bool {
        matches!(self, Location::Regional(_))
    }

    /// Region for regional resources, `None` for global ones
    pub fn region(&self) -> Option<&str> {
        match self {
            Location::Global => None,
            Location::Regional(region) => Some(region),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
