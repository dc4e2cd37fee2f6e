//! Destination configuration.
//!
//! The allowed destination tables and the per-table date-event columns
//! are fixed reference data. They are built once at startup and passed
//! explicitly into the resolver and generator rather than read from
//! globals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which destination tables rule generation may target and which
/// datetime columns each of them receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    allowed_tables: Vec<String>,
    date_fields: BTreeMap<String, Vec<String>>,
    /// The one domain handled outside the `{domain}_source_concept_id`
    /// scheme: "meas value" lands directly on this table/field.
    meas_value_table: String,
    meas_value_field: String,
}

impl DestinationConfig {
    /// The standard configuration for the eight supported CDM tables.
    pub fn cdm() -> Self {
        let allowed_tables: Vec<String> = [
            "person",
            "measurement",
            "condition_occurrence",
            "observation",
            "drug_exposure",
            "procedure_occurrence",
            "specimen",
            "device_exposure",
        ]
        .iter()
        .map(|name| (*name).to_string())
        .collect();

        let mut date_fields = BTreeMap::new();
        let entries: [(&str, &[&str]); 8] = [
            ("person", &["birth_datetime"]),
            (
                "condition_occurrence",
                &["condition_start_datetime", "condition_end_datetime"],
            ),
            ("measurement", &["measurement_datetime"]),
            ("observation", &["observation_datetime"]),
            (
                "drug_exposure",
                &["drug_exposure_start_datetime", "drug_exposure_end_datetime"],
            ),
            ("procedure_occurrence", &["procedure_datetime"]),
            ("specimen", &["specimen_datetime"]),
            (
                "device_exposure",
                &["device_exposure_start_datetime", "device_exposure_end_datetime"],
            ),
        ];
        for (table, fields) in entries {
            date_fields.insert(
                table.to_string(),
                fields.iter().map(|name| (*name).to_string()).collect(),
            );
        }

        DestinationConfig {
            allowed_tables,
            date_fields,
            meas_value_table: "measurement".to_string(),
            meas_value_field: "value_as_concept_id".to_string(),
        }
    }

    pub fn allowed_tables(&self) -> &[String] {
        &self.allowed_tables
    }

    pub fn is_allowed(&self, table_name: &str) -> bool {
        self.allowed_tables.iter().any(|name| name == table_name)
    }

    /// The datetime columns a destination table receives. Most tables
    /// have exactly one; occurrence tables carry a start and an end.
    pub fn date_fields_for(&self, table_name: &str) -> &[String] {
        self.date_fields
            .get(table_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn meas_value_table(&self) -> &str {
        &self.meas_value_table
    }

    pub fn meas_value_field(&self) -> &str {
        &self.meas_value_field
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        DestinationConfig::cdm()
    }
}
