//! The abstract mapping store.
//!
//! Persistence mechanics are an implementation choice; the engine only
//! depends on this trait. Uniqueness of `(concept, attached element)`
//! pairs and upsert semantics for rules are the store's responsibility —
//! the engine's idempotence guarantees rest on them.

use omop_model::{
    ConceptId, ContentKind, CreationType, FieldId, MappingError, MappingRule, Result, RuleKey,
    ScanReport, ScanReportConcept, ScanReportField, ScanReportId, ScanReportTable,
    ScanReportValue, SourceElement, SrConceptId, TableId, ValueId,
};

pub trait MappingStore {
    fn scan_report(&self, id: ScanReportId) -> Result<ScanReport>;
    fn scan_reports(&self) -> Result<Vec<ScanReport>>;

    fn table(&self, id: TableId) -> Result<ScanReportTable>;
    fn tables_of(&self, report: ScanReportId) -> Result<Vec<ScanReportTable>>;

    fn field(&self, id: FieldId) -> Result<ScanReportField>;
    fn fields_of(&self, table: TableId) -> Result<Vec<ScanReportField>>;

    fn value(&self, id: ValueId) -> Result<ScanReportValue>;
    fn values_of(&self, table: TableId) -> Result<Vec<ScanReportValue>>;

    fn scan_report_concept(&self, id: SrConceptId) -> Result<ScanReportConcept>;

    /// All concept assignments attached to elements of the given kind,
    /// across every scan report.
    fn concepts_attached(&self, kind: ContentKind) -> Result<Vec<ScanReportConcept>>;

    /// All concept assignments attached to fields or values of one table.
    fn concepts_for_table(&self, table: TableId) -> Result<Vec<ScanReportConcept>>;

    /// Attach a concept to a source element.
    ///
    /// Fails with [`MappingError::DuplicateConceptAssignment`] when the
    /// `(concept, element)` pair already exists.
    fn attach_concept(
        &mut self,
        concept: ConceptId,
        element: SourceElement,
        creation_type: CreationType,
    ) -> Result<ScanReportConcept>;

    /// Detach a concept assignment, cascading to its mapping rules.
    fn detach_concept(&mut self, id: SrConceptId) -> Result<()>;

    /// Create or update the rule identified by `key`.
    fn upsert_rule(&mut self, key: RuleKey, approved: bool) -> Result<MappingRule>;

    /// Delete every rule whose source field belongs to `table`; returns
    /// the number deleted.
    fn delete_rules_for_table(&mut self, table: TableId) -> Result<usize>;

    fn rules(&self) -> Result<Vec<MappingRule>>;
    fn rules_for_report(&self, report: ScanReportId) -> Result<Vec<MappingRule>>;

    /// Resolve the field a source element lives on: the field itself, or
    /// the owning field of a value.
    fn owning_field(&self, element: &SourceElement) -> Result<ScanReportField> {
        match element {
            SourceElement::Field(id) => self.field(*id),
            SourceElement::Value(id) => {
                let value = self.value(*id)?;
                self.field(value.field)
            }
        }
    }

    /// The scan report a source element ultimately belongs to.
    fn report_of_element(&self, element: &SourceElement) -> Result<ScanReportId> {
        let field = self.owning_field(element)?;
        Ok(self.table(field.table)?.scan_report)
    }

    /// Attach a batch of concepts, skipping pairs the store rejects as
    /// duplicates. Returns the assignments actually created.
    fn attach_concepts(
        &mut self,
        batch: Vec<(ConceptId, SourceElement, CreationType)>,
    ) -> Result<Vec<ScanReportConcept>> {
        let mut created = Vec::new();
        for (concept, element, creation_type) in batch {
            match self.attach_concept(concept, element, creation_type) {
                Ok(assignment) => created.push(assignment),
                Err(MappingError::DuplicateConceptAssignment { .. }) => continue,
                Err(error) => return Err(error),
            }
        }
        Ok(created)
    }
}
