//! Achievement catalog loading from config.toml
//!
//! The `[[achievements]]` entries seed the `achievements` table on start-up.
//! Entries are matched by `code`, so editing a badge's text in the config and
//! restarting updates the stored row instead of adding a duplicate.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// What a badge measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Total number of logged activities
    Activities,
    /// Longest streak of consecutive active days
    Streak,
    /// Number of completed challenges
    Challenges,
}

impl Criterion {
    /// Storage form of the criterion.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activities => "activities",
            Self::Streak => "streak",
            Self::Challenges => "challenges",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "activities" => Ok(Self::Activities),
            "streak" => Ok(Self::Streak),
            "challenges" => Ok(Self::Challenges),
            other => Err(Error::Config {
                message: format!("Unknown achievement criterion: {other}"),
            }),
        }
    }
}

/// Configuration for a single badge
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementConfig {
    /// Stable identifier
    pub code: String,
    /// Badge title
    pub name: String,
    /// Short explanation
    pub description: String,
    /// Icon reference (e.g. a Font Awesome class)
    pub icon: String,
    /// Badge tier
    #[serde(default = "default_tier")]
    pub tier: String,
    /// Measured quantity
    pub criterion: Criterion,
    /// Value the criterion must reach
    pub threshold: i64,
}

fn default_tier() -> String {
    "bronze".to_string()
}

/// Rejects empty or duplicate codes and non-positive thresholds.
pub(crate) fn validate(catalog: &[AchievementConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in catalog {
        if entry.code.trim().is_empty() {
            return Err(Error::Config {
                message: "Achievement code cannot be empty".to_string(),
            });
        }
        if !seen.insert(entry.code.as_str()) {
            return Err(Error::Config {
                message: format!("Duplicate achievement code: {}", entry.code),
            });
        }
        if entry.threshold < 1 {
            return Err(Error::Config {
                message: format!("Achievement {} needs a threshold of at least 1", entry.code),
            });
        }
    }
    Ok(())
}
