//! The `{metadata, cdm}` rules document consumed by the downstream ETL
//! tool.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::list::{RuleRow, TermMapping};

#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    pub date_created: DateTime<Utc>,
    pub dataset: String,
}

/// One destination-field entry of the document.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSpec {
    pub source_table: String,
    pub source_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_mapping: Option<TermMapping>,
}

/// `cdm[table]["<omop term> <rule id>"][destination_field]`.
pub type CdmTables = BTreeMap<String, BTreeMap<String, BTreeMap<String, TargetSpec>>>;

#[derive(Debug, Clone, Serialize)]
pub struct RulesDocument {
    pub metadata: ExportMetadata,
    pub cdm: CdmTables,
}

/// Assemble the document from a flattened listing.
///
/// Rules belonging to one assignment group under a shared
/// `"<omop term> <rule id>"` key, so independent mappings of the same
/// concept never overwrite each other.
pub fn build_document(
    rows: &[RuleRow],
    dataset: &str,
    generated_at: DateTime<Utc>,
) -> RulesDocument {
    let mut cdm: CdmTables = BTreeMap::new();
    for row in rows {
        let group = format!("{} {}", row.omop_term, row.rule_id);
        cdm.entry(row.destination_table.clone())
            .or_default()
            .entry(group)
            .or_default()
            .insert(
                row.destination_field.clone(),
                TargetSpec {
                    source_table: row.source_table.clone(),
                    source_field: row.source_field.clone(),
                    term_mapping: row.term_mapping.clone(),
                },
            );
    }
    RulesDocument {
        metadata: ExportMetadata {
            date_created: generated_at,
            dataset: dataset.to_string(),
        },
        cdm,
    }
}
