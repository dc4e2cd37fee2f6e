//! Flattened rule listing, the shared base of every export surface.

use serde::Serialize;
use serde::ser::SerializeMap;
use tracing::warn;

use omop_model::{
    CdmCatalogue, ConceptId, CreationType, ScanReportId, SourceElement, SrConceptId,
};
use omop_store::MappingStore;
use omop_vocab::VocabularySource;

use crate::error::ExportError;

/// The term translation a `*_concept_id` destination carries.
///
/// A concept attached to a value maps that one term; a concept attached
/// to a field maps the whole column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermMapping {
    Value {
        source_value: String,
        concept: ConceptId,
    },
    Field(ConceptId),
}

impl Serialize for TermMapping {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TermMapping::Value {
                source_value,
                concept,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(source_value, concept)?;
                map.end()
            }
            TermMapping::Field(concept) => concept.serialize(serializer),
        }
    }
}

/// One rule of the flattened listing, with every name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRow {
    /// The concept assignment id; the rules of one assignment share it.
    pub rule_id: SrConceptId,
    pub omop_term: String,
    pub destination_table: String,
    pub destination_field: String,
    pub domain: String,
    pub source_table: String,
    pub source_field: String,
    pub term_mapping: Option<TermMapping>,
    pub creation_type: CreationType,
    pub concept_id: ConceptId,
}

/// Build the listing for one scan report.
///
/// Rules referencing assignments or concepts that no longer exist are
/// skipped with a warning rather than failing the export.
pub fn build_rule_rows<S: MappingStore, V: VocabularySource>(
    store: &S,
    vocab: &V,
    catalogue: &CdmCatalogue,
    report: ScanReportId,
) -> std::result::Result<Vec<RuleRow>, ExportError> {
    let mut rows = Vec::new();
    for rule in store.rules_for_report(report)? {
        let assignment = match store.scan_report_concept(rule.concept) {
            Ok(assignment) => assignment,
            Err(_) => {
                warn!(rule = rule.id.value(), "rule references a deleted assignment");
                continue;
            }
        };
        let Some(concept) = vocab.concept(assignment.concept)? else {
            warn!(
                concept_id = assignment.concept.value(),
                "assigned concept missing from vocabulary"
            );
            continue;
        };

        let Some(omop_field) = catalogue.field(rule.omop_field) else {
            warn!(rule = rule.id.value(), "rule targets an unknown destination field");
            continue;
        };
        let Some(omop_table) = catalogue.table(omop_field.table) else {
            continue;
        };

        let source_field = store.field(rule.source_field)?;
        let source_table = store.table(source_field.table)?;

        // Term translation applies only to concept-id destinations.
        let term_mapping = if omop_field.name.contains("concept_id") {
            match assignment.attached_to {
                SourceElement::Value(value_id) => {
                    let value = store.value(value_id)?;
                    Some(TermMapping::Value {
                        source_value: value.value,
                        concept: concept.concept_id,
                    })
                }
                SourceElement::Field(_) => Some(TermMapping::Field(concept.concept_id)),
            }
        } else {
            None
        };

        rows.push(RuleRow {
            rule_id: assignment.id,
            omop_term: concept.concept_name.clone(),
            destination_table: omop_table.name.clone(),
            destination_field: omop_field.name.clone(),
            domain: concept.domain_id.clone(),
            source_table: strip_bom(&source_table.name),
            source_field: strip_bom(&source_field.name),
            term_mapping,
            creation_type: assignment.creation_type,
            concept_id: concept.concept_id,
        });
    }

    rows.sort_by(|a, b| {
        a.rule_id
            .cmp(&b.rule_id)
            .then_with(|| a.destination_table.cmp(&b.destination_table))
            .then_with(|| a.destination_field.cmp(&b.destination_field))
            .then_with(|| a.source_field.cmp(&b.source_field))
    });
    Ok(rows)
}

/// Spreadsheet exports sometimes smuggle a byte-order mark into the
/// first column name.
fn strip_bom(name: &str) -> String {
    name.replace('\u{feff}', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_mapping_serializes_per_attachment_kind() {
        let value_mapping = TermMapping::Value {
            source_value: "Headache".to_string(),
            concept: ConceptId::new(254761),
        };
        assert_eq!(
            serde_json::to_string(&value_mapping).unwrap(),
            "{\"Headache\":254761}"
        );
        let field_mapping = TermMapping::Field(ConceptId::new(254761));
        assert_eq!(serde_json::to_string(&field_mapping).unwrap(), "254761");
    }

    #[test]
    fn bom_is_stripped_from_source_names() {
        assert_eq!(strip_bom("\u{feff}PersonID"), "PersonID");
        assert_eq!(strip_bom("PersonID"), "PersonID");
    }
}
