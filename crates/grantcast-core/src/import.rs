//! Bulk loading of programs and confirmed windows from JSON.
//!
//! ```json
//! {
//!   "programs": [{ "id": "mono", "name": "Manufacturing", "prep_weeks": 8 }],
//!   "windows": [{ "program_id": "mono", "year": 2024, "slot": 1, "start_date": "2024-04-10" }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Program, WindowRecord};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportBatch {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub windows: Vec<WindowRecord>,
}

impl ImportBatch {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub programs_saved: usize,
    pub windows_inserted: usize,
    /// Stored windows whose dates, budget or status changed.
    pub windows_updated: usize,
    /// Windows already stored unchanged.
    pub windows_skipped: usize,
    /// One message per rejected entry.
    pub rejected: Vec<String>,
}
