//! Cross-report ancestor/descendant analysis.
//!
//! For each concept mapped in one scan report, find vocabulary ancestors
//! and descendants of it that are mapped in *other* reports, and where
//! those relatives are mapped from.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use omop_model::{
    CdmCatalogue, ConceptAncestor, ConceptId, ContentKind, FieldId, MappingRule, Result,
    ScanReportId, TableId,
};
use omop_store::MappingStore;
use omop_vocab::VocabularySource;

/// Where a relative concept is mapped from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub scan_report: ScanReportId,
    pub table: TableId,
    pub table_name: String,
    pub field: FieldId,
    pub field_name: String,
    pub kind: ContentKind,
}

/// An ancestor or descendant of an analysed concept, mapped elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedConcept {
    pub concept_id: ConceptId,
    pub concept_name: String,
    pub min_levels_of_separation: u32,
    pub max_levels_of_separation: u32,
    pub mapped_from: Vec<SourceLocation>,
}

/// Analysis entry for one concept of the target report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAnalysis {
    pub concept_id: ConceptId,
    pub concept_name: String,
    pub ancestors: Vec<RelatedConcept>,
    pub descendants: Vec<RelatedConcept>,
}

/// Full analysis of one scan report against all others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub entries: Vec<ConceptAnalysis>,
}

/// Finds hierarchy relatives of a report's mapped concepts in other
/// reports.
pub struct AncestorDescendantAnalyzer<'a, S, V> {
    store: &'a S,
    vocab: &'a V,
    catalogue: &'a CdmCatalogue,
}

impl<'a, S: MappingStore, V: VocabularySource> AncestorDescendantAnalyzer<'a, S, V> {
    pub fn new(store: &'a S, vocab: &'a V, catalogue: &'a CdmCatalogue) -> Self {
        AncestorDescendantAnalyzer {
            store,
            vocab,
            catalogue,
        }
    }

    pub fn analyse(&self, report: ScanReportId) -> Result<AnalysisReport> {
        let own_concepts = self.mapped_concepts(Some(report), None)?;
        // Concept id -> informative rules elsewhere.
        let elsewhere = self.mapped_concepts(None, Some(report))?;

        let mut entries = Vec::new();
        for concept_id in own_concepts.keys() {
            let Some(concept) = self.vocab.concept(*concept_id)? else {
                warn!(concept_id = concept_id.value(), "mapped concept missing from vocabulary");
                continue;
            };

            let ancestors =
                self.relatives(self.vocab.ancestors_of(*concept_id)?, *concept_id, &elsewhere, true)?;
            let descendants = self.relatives(
                self.vocab.descendants_of(*concept_id)?,
                *concept_id,
                &elsewhere,
                false,
            )?;

            if ancestors.is_empty() && descendants.is_empty() {
                continue;
            }
            entries.push(ConceptAnalysis {
                concept_id: *concept_id,
                concept_name: concept.concept_name,
                ancestors,
                descendants,
            });
        }
        Ok(AnalysisReport { entries })
    }

    /// Distinct concept ids mapped by rules, restricted to one report or
    /// to everything but one, each with the rules that map it.
    fn mapped_concepts(
        &self,
        only: Option<ScanReportId>,
        exclude: Option<ScanReportId>,
    ) -> Result<BTreeMap<ConceptId, Vec<MappingRule>>> {
        let mut mapped: BTreeMap<ConceptId, Vec<MappingRule>> = BTreeMap::new();
        for rule in self.store.rules()? {
            if only.is_some_and(|id| rule.scan_report != id) {
                continue;
            }
            if exclude.is_some_and(|id| rule.scan_report == id) {
                continue;
            }
            let assignment = match self.store.scan_report_concept(rule.concept) {
                Ok(assignment) => assignment,
                Err(_) => {
                    warn!(rule = rule.id.value(), "rule references a deleted assignment");
                    continue;
                }
            };
            mapped.entry(assignment.concept).or_default().push(rule);
        }
        Ok(mapped)
    }

    /// Keep relatives mapped elsewhere, excluding the concept itself, and
    /// resolve where each is mapped from.
    fn relatives(
        &self,
        rows: Vec<ConceptAncestor>,
        own: ConceptId,
        elsewhere: &BTreeMap<ConceptId, Vec<MappingRule>>,
        ancestors: bool,
    ) -> Result<Vec<RelatedConcept>> {
        let mut related = Vec::new();
        let mut seen = BTreeSet::new();
        for row in rows {
            let relative = if ancestors {
                row.ancestor_concept_id
            } else {
                row.descendant_concept_id
            };
            if relative == own || !seen.insert(relative) {
                continue;
            }
            let Some(rules) = elsewhere.get(&relative) else {
                continue;
            };
            let Some(concept) = self.vocab.concept(relative)? else {
                warn!(concept_id = relative.value(), "relative concept missing from vocabulary");
                continue;
            };
            let mapped_from = self.locations(rules)?;
            if mapped_from.is_empty() {
                continue;
            }
            related.push(RelatedConcept {
                concept_id: relative,
                concept_name: concept.concept_name,
                min_levels_of_separation: row.min_levels_of_separation,
                max_levels_of_separation: row.max_levels_of_separation,
                mapped_from,
            });
        }
        Ok(related)
    }

    /// Source locations for the informative rules of a relative,
    /// excluding the structural person-id/datetime/source-concept rules
    /// that every assignment carries.
    fn locations(&self, rules: &[MappingRule]) -> Result<Vec<SourceLocation>> {
        let mut locations = BTreeSet::new();
        for rule in rules {
            let Some(omop_field) = self.catalogue.field(rule.omop_field) else {
                continue;
            };
            if is_structural_field(&omop_field.name) {
                continue;
            }
            let field = self.store.field(rule.source_field)?;
            let table = self.store.table(field.table)?;
            let kind = self
                .store
                .scan_report_concept(rule.concept)?
                .attached_to
                .kind();
            locations.insert(SourceLocation {
                scan_report: rule.scan_report,
                table: table.id,
                table_name: table.name,
                field: field.id,
                field_name: field.name,
                kind,
            });
        }
        Ok(locations.into_iter().collect())
    }
}

/// Structural rules are generated for every assignment and say nothing
/// about where a concept is meaningfully mapped.
fn is_structural_field(name: &str) -> bool {
    name.contains("person_id") || name.contains("datetime") || name.contains("source")
}
