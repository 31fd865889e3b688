//! The three relationship loading strategies

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// How related records are brought in for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingStrategy {
    /// Roots only; each path is loaded on first access, one round trip per
    /// (instance, segment)
    Lazy,
    /// Roots and every named path in a single join
    Eager,
    /// Roots first, then one batched query per distinct path
    #[default]
    Explicit,
}

impl LoadingStrategy {
    pub const ALL: [LoadingStrategy; 3] = [LoadingStrategy::Lazy, LoadingStrategy::Eager, LoadingStrategy::Explicit];

    pub fn as_str(self) -> &'static str {
        match self {
            LoadingStrategy::Lazy => "lazy",
            LoadingStrategy::Eager => "eager",
            LoadingStrategy::Explicit => "explicit",
        }
    }
}

impl fmt::Display for LoadingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lazy" => Ok(LoadingStrategy::Lazy),
            "eager" => Ok(LoadingStrategy::Eager),
            "explicit" => Ok(LoadingStrategy::Explicit),
            other => Err(format!("Unknown loading strategy: {}", other)),
        }
    }
}
