//! Operator inputs for one run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether recommended tracks should be vocal, instrumental, or either
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VocalPreference {
    #[serde(rename = "v")]
    Vocal,
    #[serde(rename = "i")]
    Instrumental,
    #[default]
    #[serde(rename = "b")]
    Both,
}

impl VocalPreference {
    /// Single-letter code used in descriptions and presets
    pub fn code(self) -> &'static str {
        match self {
            VocalPreference::Vocal => "v",
            VocalPreference::Instrumental => "i",
            VocalPreference::Both => "b",
        }
    }

    /// Minimum instrumentalness implied by the preference (`None` = unconstrained)
    pub fn min_instrumentalness(self) -> Option<f64> {
        match self {
            VocalPreference::Instrumental => Some(0.5),
            VocalPreference::Vocal => Some(0.0),
            VocalPreference::Both => None,
        }
    }
}

impl fmt::Display for VocalPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VocalPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "vocal" => Ok(VocalPreference::Vocal),
            "i" | "instrumental" => Ok(VocalPreference::Instrumental),
            "b" | "both" => Ok(VocalPreference::Both),
            other => Err(format!(
                "invalid vocal preference '{}': expected (v)ocal, (i)nstrumental or (b)oth",
                other
            )),
        }
    }
}

/// Everything the operator supplies for one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub book_title: String,
    /// Free-text comments and partial chapter summaries
    pub notes: String,
    pub music_preferences: String,
    #[serde(default)]
    pub vocal_preference: VocalPreference,
    #[serde(default)]
    pub min_instrumentalness: Option<f64>,
}
