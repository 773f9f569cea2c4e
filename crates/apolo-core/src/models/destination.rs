//! Destination model

use serde::{Deserialize, Serialize};

/// Named list of number prefixes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Destination {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl Destination {
    pub fn new(id: impl Into<String>, prefixes: Vec<String>) -> Self {
        Self {
            id: id.into(),
            prefixes,
        }
    }
}
