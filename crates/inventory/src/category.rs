//! Item category vocabulary.

use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult, ValueObject};

/// Categories every fresh ledger starts with.
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Sensors",
    "Motors",
    "Microcontrollers",
    "Power",
    "Tools",
    "Others",
];

/// A category name. Comparison is exact after trimming; the registry decides
/// uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl ValueObject for Category {}

impl Category {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::invalid("category cannot be empty"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn defaults() -> Vec<Category> {
        DEFAULT_CATEGORIES
            .iter()
            .map(|name| Category((*name).to_string()))
            .collect()
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
