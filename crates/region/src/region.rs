use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag matching every region inside a `targetRegions` array.
pub const ALL_REGIONS: &str = "all";

/// Audience region used to pick content variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    France,
    Morocco,
    #[default]
    International,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl Region {
    /// Map an ISO 3166-1 alpha-2 country code to a region.
    /// Anything that is not France or Morocco is international.
    pub fn from_country_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "FR" => Region::France,
            "MA" => Region::Morocco,
            _ => Region::International,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::France => "france",
            Region::Morocco => "morocco",
            Region::International => "international",
        }
    }

    /// Whether a single `targetRegions` tag selects this region.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        tag.eq_ignore_ascii_case(ALL_REGIONS) || tag.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "france" | "fr" => Ok(Region::France),
            "morocco" | "ma" => Ok(Region::Morocco),
            "international" | "intl" => Ok(Region::International),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}
