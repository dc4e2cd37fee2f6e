//! In-memory store, serde-loadable from a JSON snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use omop_model::{
    ConceptId, ContentKind, CreationType, FieldId, MappingError, MappingRule, Result, RuleId,
    RuleKey, ScanReport, ScanReportConcept, ScanReportField, ScanReportId, ScanReportTable,
    ScanReportValue, SourceElement, SrConceptId, TableId, ValueId,
};

use crate::store::MappingStore;

/// Serializable store snapshot, the CLI's on-disk input format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub scan_reports: Vec<ScanReport>,
    pub tables: Vec<ScanReportTable>,
    pub fields: Vec<ScanReportField>,
    #[serde(default)]
    pub values: Vec<ScanReportValue>,
    #[serde(default)]
    pub concepts: Vec<ScanReportConcept>,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

/// In-memory [`MappingStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    scan_reports: BTreeMap<ScanReportId, ScanReport>,
    tables: BTreeMap<TableId, ScanReportTable>,
    fields: BTreeMap<FieldId, ScanReportField>,
    values: BTreeMap<ValueId, ScanReportValue>,
    concepts: BTreeMap<SrConceptId, ScanReportConcept>,
    rules: BTreeMap<RuleId, MappingRule>,
    rule_keys: BTreeMap<RuleKey, RuleId>,
    next_concept: i64,
    next_rule: i64,
}

impl InMemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        let mut store = InMemoryStore::default();
        for report in snapshot.scan_reports {
            store.scan_reports.insert(report.id, report);
        }
        for table in snapshot.tables {
            store.tables.insert(table.id, table);
        }
        for field in snapshot.fields {
            store.fields.insert(field.id, field);
        }
        for value in snapshot.values {
            store.values.insert(value.id, value);
        }
        for concept in snapshot.concepts {
            store.next_concept = store.next_concept.max(concept.id.value());
            store.concepts.insert(concept.id, concept);
        }
        for rule in snapshot.rules {
            store.next_rule = store.next_rule.max(rule.id.value());
            store.rule_keys.insert(rule.key(), rule.id);
            store.rules.insert(rule.id, rule);
        }
        store
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read store snapshot from {}", path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse store snapshot from {}", path.display()))?;
        Ok(InMemoryStore::new(snapshot))
    }

    /// Write the current state back out as a snapshot.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .context("Failed to serialize store snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write store snapshot to {}", path.display()))?;
        Ok(())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            scan_reports: self.scan_reports.values().cloned().collect(),
            tables: self.tables.values().cloned().collect(),
            fields: self.fields.values().cloned().collect(),
            values: self.values.values().cloned().collect(),
            concepts: self.concepts.values().cloned().collect(),
            rules: self.rules.values().cloned().collect(),
        }
    }

    fn element_exists(&self, element: &SourceElement) -> Result<()> {
        match element {
            SourceElement::Field(id) if self.fields.contains_key(id) => Ok(()),
            SourceElement::Value(id) if self.values.contains_key(id) => Ok(()),
            SourceElement::Field(id) => Err(MappingError::unknown_id("field", *id)),
            SourceElement::Value(id) => Err(MappingError::unknown_id("value", *id)),
        }
    }

    fn field_ids_of(&self, table: TableId) -> Vec<FieldId> {
        self.fields
            .values()
            .filter(|field| field.table == table)
            .map(|field| field.id)
            .collect()
    }
}

impl From<StoreSnapshot> for InMemoryStore {
    fn from(snapshot: StoreSnapshot) -> Self {
        InMemoryStore::new(snapshot)
    }
}

impl MappingStore for InMemoryStore {
    fn scan_report(&self, id: ScanReportId) -> Result<ScanReport> {
        self.scan_reports
            .get(&id)
            .cloned()
            .ok_or_else(|| MappingError::unknown_id("scan report", id))
    }

    fn scan_reports(&self) -> Result<Vec<ScanReport>> {
        Ok(self.scan_reports.values().cloned().collect())
    }

    fn table(&self, id: TableId) -> Result<ScanReportTable> {
        self.tables
            .get(&id)
            .cloned()
            .ok_or_else(|| MappingError::unknown_id("table", id))
    }

    fn tables_of(&self, report: ScanReportId) -> Result<Vec<ScanReportTable>> {
        Ok(self
            .tables
            .values()
            .filter(|table| table.scan_report == report)
            .cloned()
            .collect())
    }

    fn field(&self, id: FieldId) -> Result<ScanReportField> {
        self.fields
            .get(&id)
            .cloned()
            .ok_or_else(|| MappingError::unknown_id("field", id))
    }

    fn fields_of(&self, table: TableId) -> Result<Vec<ScanReportField>> {
        Ok(self
            .fields
            .values()
            .filter(|field| field.table == table)
            .cloned()
            .collect())
    }

    fn value(&self, id: ValueId) -> Result<ScanReportValue> {
        self.values
            .get(&id)
            .cloned()
            .ok_or_else(|| MappingError::unknown_id("value", id))
    }

    fn values_of(&self, table: TableId) -> Result<Vec<ScanReportValue>> {
        let field_ids = self.field_ids_of(table);
        Ok(self
            .values
            .values()
            .filter(|value| field_ids.contains(&value.field))
            .cloned()
            .collect())
    }

    fn scan_report_concept(&self, id: SrConceptId) -> Result<ScanReportConcept> {
        self.concepts
            .get(&id)
            .cloned()
            .ok_or_else(|| MappingError::unknown_id("scan report concept", id))
    }

    fn concepts_attached(&self, kind: ContentKind) -> Result<Vec<ScanReportConcept>> {
        Ok(self
            .concepts
            .values()
            .filter(|concept| concept.attached_to.kind() == kind)
            .cloned()
            .collect())
    }

    fn concepts_for_table(&self, table: TableId) -> Result<Vec<ScanReportConcept>> {
        let field_ids = self.field_ids_of(table);
        let value_ids: Vec<ValueId> = self
            .values
            .values()
            .filter(|value| field_ids.contains(&value.field))
            .map(|value| value.id)
            .collect();
        Ok(self
            .concepts
            .values()
            .filter(|concept| match concept.attached_to {
                SourceElement::Field(id) => field_ids.contains(&id),
                SourceElement::Value(id) => value_ids.contains(&id),
            })
            .cloned()
            .collect())
    }

    fn attach_concept(
        &mut self,
        concept: ConceptId,
        element: SourceElement,
        creation_type: CreationType,
    ) -> Result<ScanReportConcept> {
        self.element_exists(&element)?;
        let duplicate = self
            .concepts
            .values()
            .any(|existing| existing.concept == concept && existing.attached_to == element);
        if duplicate {
            return Err(MappingError::DuplicateConceptAssignment { concept, element });
        }
        self.next_concept += 1;
        let assignment = ScanReportConcept {
            id: SrConceptId::new(self.next_concept),
            concept,
            attached_to: element,
            creation_type,
        };
        self.concepts.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    fn detach_concept(&mut self, id: SrConceptId) -> Result<()> {
        if self.concepts.remove(&id).is_none() {
            return Err(MappingError::unknown_id("scan report concept", id));
        }
        let orphaned: Vec<RuleId> = self
            .rules
            .values()
            .filter(|rule| rule.concept == id)
            .map(|rule| rule.id)
            .collect();
        for rule_id in orphaned {
            if let Some(rule) = self.rules.remove(&rule_id) {
                self.rule_keys.remove(&rule.key());
            }
        }
        Ok(())
    }

    fn upsert_rule(&mut self, key: RuleKey, approved: bool) -> Result<MappingRule> {
        if !self.scan_reports.contains_key(&key.scan_report) {
            return Err(MappingError::unknown_id("scan report", key.scan_report));
        }
        if !self.fields.contains_key(&key.source_field) {
            return Err(MappingError::unknown_id("field", key.source_field));
        }
        if !self.concepts.contains_key(&key.concept) {
            return Err(MappingError::unknown_id("scan report concept", key.concept));
        }
        if let Some(rule_id) = self.rule_keys.get(&key).copied()
            && let Some(rule) = self.rules.get_mut(&rule_id)
        {
            rule.approved = approved;
            return Ok(rule.clone());
        }
        self.next_rule += 1;
        let rule = MappingRule {
            id: RuleId::new(self.next_rule),
            scan_report: key.scan_report,
            omop_field: key.omop_field,
            source_field: key.source_field,
            concept: key.concept,
            approved,
        };
        self.rule_keys.insert(key, rule.id);
        self.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    fn delete_rules_for_table(&mut self, table: TableId) -> Result<usize> {
        let field_ids = self.field_ids_of(table);
        let doomed: Vec<RuleId> = self
            .rules
            .values()
            .filter(|rule| field_ids.contains(&rule.source_field))
            .map(|rule| rule.id)
            .collect();
        let deleted = doomed.len();
        for rule_id in doomed {
            if let Some(rule) = self.rules.remove(&rule_id) {
                self.rule_keys.remove(&rule.key());
            }
        }
        Ok(deleted)
    }

    fn rules(&self) -> Result<Vec<MappingRule>> {
        Ok(self.rules.values().cloned().collect())
    }

    fn rules_for_report(&self, report: ScanReportId) -> Result<Vec<MappingRule>> {
        Ok(self
            .rules
            .values()
            .filter(|rule| rule.scan_report == report)
            .cloned()
            .collect())
    }
}
