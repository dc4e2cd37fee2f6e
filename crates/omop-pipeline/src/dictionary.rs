//! The vocabulary dictionary supplied alongside a scan report.
//!
//! Maps table name → field name → vocabulary id. Fields without an entry
//! get no vocabulary and skip concept lookup entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularyDictionary(BTreeMap<String, BTreeMap<String, String>>);

impl VocabularyDictionary {
    pub fn new(entries: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        VocabularyDictionary(entries)
    }

    pub fn empty() -> Self {
        VocabularyDictionary::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The vocabulary id declared for a field, if any.
    pub fn vocab_for(&self, table_name: &str, field_name: &str) -> Option<&str> {
        self.0
            .get(table_name)
            .and_then(|fields| fields.get(field_name))
            .map(String::as_str)
    }
}
