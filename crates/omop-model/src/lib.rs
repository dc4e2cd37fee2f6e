pub mod catalogue;
pub mod error;
pub mod ids;
pub mod rules;
pub mod scan_report;
pub mod vocab;

pub use catalogue::{CdmCatalogue, OmopField, OmopTable};
pub use error::{MappingError, Result};
pub use ids::{
    ConceptId, FieldId, OmopFieldId, OmopTableId, RuleId, ScanReportId, SrConceptId, TableId,
    ValueId,
};
pub use rules::{MappingRule, RuleKey};
pub use scan_report::{
    ContentKind, CreationType, ScanReport, ScanReportConcept, ScanReportField, ScanReportTable,
    ScanReportValue, SourceElement,
};
pub use vocab::{Concept, ConceptAncestor, ConceptRelationship, MAPS_TO, StandardConcept};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_rule_key_projects_identity() {
        let rule = MappingRule {
            id: RuleId::new(1),
            scan_report: ScanReportId::new(2),
            omop_field: OmopFieldId::new(3),
            source_field: FieldId::new(4),
            concept: SrConceptId::new(5),
            approved: true,
        };
        let key = rule.key();
        assert_eq!(key.scan_report, ScanReportId::new(2));
        assert_eq!(key.omop_field, OmopFieldId::new(3));
        assert_eq!(key.source_field, FieldId::new(4));
        assert_eq!(key.concept, SrConceptId::new(5));
    }

    #[test]
    fn duplicate_assignment_error_names_the_element() {
        let error = MappingError::DuplicateConceptAssignment {
            concept: ConceptId::new(8532),
            element: SourceElement::Value(ValueId::new(17)),
        };
        assert_eq!(
            error.to_string(),
            "concept 8532 is already attached to value 17"
        );
    }
}
