//! Display languages for resolved meanings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language requested by the caller.
///
/// Czech is the default and the fallback for missing translations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Cs,
    En,
}

impl Language {
    pub const DEFAULT: Language = Language::Cs;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cs => "cs",
            Self::En => "en",
        }
    }

    /// Parse a language tag, falling back to the default when absent or unrecognized.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|tag| tag.parse().ok()).unwrap_or_default()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Self::Cs),
            "en" => Ok(Self::En),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
