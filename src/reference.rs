//! Prior results ("reference store") queried by test name.
//!
//! The extractor only needs one capability from the store: given the exact
//! test name printed on the report, return the most recent prior value and
//! the date it was recorded. Keeping that behind [`ReferenceStore`] lets a
//! host application back it with a database while the CLI and the tests use
//! the in-memory [`InMemoryReferenceStore`].
//!
//! Lookups are exact: case- and whitespace-sensitive. A name that differs in
//! any way simply has no prior data.

use crate::error::LabSheetError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A previously recorded value for one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorResult {
    pub value: f64,
    /// Date of the prior measurement, as stored (e.g. `2024-12-15`).
    pub date: String,
}

impl PriorResult {
    pub fn new(value: f64, date: impl Into<String>) -> Self {
        Self {
            value,
            date: date.into(),
        }
    }
}

/// Read-only lookup of prior results by exact test name.
pub trait ReferenceStore: Send + Sync {
    /// Return the prior result recorded under `test_name`, if any.
    fn lookup(&self, test_name: &str) -> Option<PriorResult>;
}

impl ReferenceStore for HashMap<String, PriorResult> {
    fn lookup(&self, test_name: &str) -> Option<PriorResult> {
        self.get(test_name).cloned()
    }
}

/// HashMap-backed store, loadable from JSON.
///
/// The JSON layout is an object keyed by test name:
///
/// ```json
/// { "Hemoglobin": { "value": 13.2, "date": "2024-12-15" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryReferenceStore {
    entries: HashMap<String, PriorResult>,
}

impl InMemoryReferenceStore {
    /// An empty store: every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in dataset used when no reference file is configured.
    pub fn seeded() -> Self {
        const SEED_DATE: &str = "2024-12-15";
        [
            ("Hemoglobin", 13.2),
            ("WBC Count", 8900.0),
            ("Platelet Count", 180000.0),
            ("Fasting Blood Sugar", 125.0),
            ("Cholesterol", 175.0),
            ("Triglyceride", 145.0),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), PriorResult::new(value, SEED_DATE)))
        .collect()
    }

    /// Parse a store from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a store from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LabSheetError> {
        let path = path.as_ref();
        let invalid = |detail: String| LabSheetError::InvalidReferenceData {
            path: path.to_path_buf(),
            detail,
        };

        let json = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let store = Self::from_json_str(&json).map_err(|e| invalid(e.to_string()))?;
        debug!(
            "Loaded {} prior results from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Insert or replace the prior result for `test_name`.
    pub fn insert(&mut self, test_name: impl Into<String>, prior: PriorResult) {
        self.entries.insert(test_name.into(), prior);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PriorResult)> for InMemoryReferenceStore {
    fn from_iter<I: IntoIterator<Item = (String, PriorResult)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn lookup(&self, test_name: &str) -> Option<PriorResult> {
        self.entries.get(test_name).cloned()
    }
}
