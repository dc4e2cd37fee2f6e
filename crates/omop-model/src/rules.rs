//! Structural mapping rules.

use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, OmopFieldId, RuleId, ScanReportId, SrConceptId};

/// One synthesized mapping rule: populate `omop_field` from
/// `source_field`, justified by a concept assignment.
///
/// Rules are unique on [`RuleKey`]; regeneration upserts rather than
/// duplicating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub id: RuleId,
    pub scan_report: ScanReportId,
    pub omop_field: OmopFieldId,
    pub source_field: FieldId,
    /// The concept assignment this rule was generated for. Deleting the
    /// assignment cascades to its rules.
    pub concept: SrConceptId,
    pub approved: bool,
}

impl MappingRule {
    pub fn key(&self) -> RuleKey {
        RuleKey {
            scan_report: self.scan_report,
            omop_field: self.omop_field,
            source_field: self.source_field,
            concept: self.concept,
        }
    }
}

/// The natural key of a mapping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub scan_report: ScanReportId,
    pub omop_field: OmopFieldId,
    pub source_field: FieldId,
    pub concept: SrConceptId,
}
