//! Reuse of concept assignments across scan reports.
//!
//! When a table's concepts are rebuilt, fields and values that are
//! structurally identical to concept-bearing elements in other reports
//! inherit those concepts without user interaction. A field matches on
//! its name; a value matches on the `(value, description, field name)`
//! triple.

use std::collections::BTreeMap;

use tracing::{debug, info};

use omop_model::{
    ConceptId, ContentKind, CreationType, Result, ScanReport, ScanReportConcept, ScanReportId,
    SourceElement, TableId,
};
use omop_store::MappingStore;

/// Decides which scan reports participate in reuse.
///
/// Report activity is external state; the matcher only ever consults this
/// predicate.
pub trait ActivePolicy {
    fn is_active(&self, report: &ScanReport) -> bool;
}

impl<F: Fn(&ScanReport) -> bool> ActivePolicy for F {
    fn is_active(&self, report: &ScanReport) -> bool {
        self(report)
    }
}

/// Default policy: the report's own activity flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlaggedActive;

impl ActivePolicy for FlaggedActive {
    fn is_active(&self, report: &ScanReport) -> bool {
        report.active
    }
}

/// The reuse key of a value: its text, description, and owning field
/// name.
type ValueKey = (String, Option<String>, String);

/// Copies existing concept decisions onto structurally identical new
/// elements.
pub struct ReuseMatcher<'a, P: ActivePolicy> {
    policy: &'a P,
}

impl<'a, P: ActivePolicy> ReuseMatcher<'a, P> {
    pub fn new(policy: &'a P) -> Self {
        ReuseMatcher { policy }
    }

    /// Reuse field-level concepts for every field of `table_id`.
    ///
    /// Each concept id found under a matching name is attached with
    /// `CreationType::Reuse`. A key may map to several concept ids when
    /// independent reports disagree; all of them are reused. No match is
    /// no action.
    pub fn reuse_field_concepts<S: MappingStore>(
        &self,
        store: &mut S,
        table_id: TableId,
    ) -> Result<Vec<ScanReportConcept>> {
        let target_report = store.table(table_id)?.scan_report;

        let mut by_name: BTreeMap<String, Vec<ConceptId>> = BTreeMap::new();
        for existing in store.concepts_attached(ContentKind::Field)? {
            let SourceElement::Field(field_id) = existing.attached_to else {
                continue;
            };
            let field = match store.field(field_id) {
                Ok(field) => field,
                // Dangling attachments never abort the batch.
                Err(_) => continue,
            };
            if !self.in_scope(store, store.table(field.table)?.scan_report, target_report)? {
                continue;
            }
            let concepts = by_name.entry(field.name).or_default();
            if !concepts.contains(&existing.concept) {
                concepts.push(existing.concept);
            }
        }
        debug!(candidates = by_name.len(), "field reuse keys gathered");

        let mut batch = Vec::new();
        for field in store.fields_of(table_id)? {
            if let Some(concepts) = by_name.get(&field.name) {
                for concept in concepts {
                    batch.push((
                        *concept,
                        SourceElement::Field(field.id),
                        CreationType::Reuse,
                    ));
                }
            }
        }
        let created = store.attach_concepts(batch)?;
        info!(table = table_id.value(), reused = created.len(), "field concepts reused");
        Ok(created)
    }

    /// Reuse value-level concepts for every value of `table_id`.
    pub fn reuse_value_concepts<S: MappingStore>(
        &self,
        store: &mut S,
        table_id: TableId,
    ) -> Result<Vec<ScanReportConcept>> {
        let target_report = store.table(table_id)?.scan_report;

        let mut by_key: BTreeMap<ValueKey, Vec<ConceptId>> = BTreeMap::new();
        for existing in store.concepts_attached(ContentKind::Value)? {
            let SourceElement::Value(value_id) = existing.attached_to else {
                continue;
            };
            let value = match store.value(value_id) {
                Ok(value) => value,
                Err(_) => continue,
            };
            let field = store.field(value.field)?;
            if !self.in_scope(store, store.table(field.table)?.scan_report, target_report)? {
                continue;
            }
            let key = (value.value, value.value_description, field.name);
            let concepts = by_key.entry(key).or_default();
            if !concepts.contains(&existing.concept) {
                concepts.push(existing.concept);
            }
        }
        debug!(candidates = by_key.len(), "value reuse keys gathered");

        let mut batch = Vec::new();
        for value in store.values_of(table_id)? {
            let field = store.field(value.field)?;
            let key = (value.value.clone(), value.value_description.clone(), field.name);
            if let Some(concepts) = by_key.get(&key) {
                for concept in concepts {
                    batch.push((
                        *concept,
                        SourceElement::Value(value.id),
                        CreationType::Reuse,
                    ));
                }
            }
        }
        let created = store.attach_concepts(batch)?;
        info!(table = table_id.value(), reused = created.len(), "value concepts reused");
        Ok(created)
    }

    /// An existing assignment is considered only when it lives in a
    /// different, active scan report.
    fn in_scope<S: MappingStore>(
        &self,
        store: &S,
        report: ScanReportId,
        target_report: ScanReportId,
    ) -> Result<bool> {
        if report == target_report {
            return Ok(false);
        }
        Ok(self.policy.is_active(&store.scan_report(report)?))
    }
}
