use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What an image scan was asked to find.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// Food items visible in a photo of shelves or a fridge.
    Inventory,
    /// A purchase receipt or bill.
    Receipt,
    /// A cooked dish.
    Recipe,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Inventory => "inventory",
            ScanKind::Receipt => "receipt",
            ScanKind::Recipe => "recipe",
        }
    }

    /// Confidence assumed when the model does not report one.
    pub fn default_confidence(&self) -> f64 {
        match self {
            ScanKind::Inventory => 0.8,
            ScanKind::Receipt => 0.7,
            ScanKind::Recipe => 0.6,
        }
    }
}

impl core::fmt::Display for ScanKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("unknown scan type '{0}'")]
    UnknownKind(String),
}

impl FromStr for ScanKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inventory" => Ok(ScanKind::Inventory),
            "receipt" => Ok(ScanKind::Receipt),
            "recipe" => Ok(ScanKind::Recipe),
            other => Err(ScanError::UnknownKind(other.to_string())),
        }
    }
}
