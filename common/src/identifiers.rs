//! Identifier types for ExchangeDesk entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a commission tier.
///
/// Fixture data uses short human-assigned ids (`"tier-1"`); tiers created at
/// runtime get a time-ordered UUID v7 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(String);

impl TierId {
    /// Create a tier ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-ordered tier ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TierId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TierId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for an exchange-rate setting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateSettingId(String);

impl RateSettingId {
    /// Create a rate setting ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RateSettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RateSettingId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
