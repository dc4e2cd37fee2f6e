//! Mapping-rule synthesis for one concept assignment.

use tracing::debug;

use omop_model::{
    CdmCatalogue, Concept, FieldId, MappingError, MappingRule, OmopField, Result, RuleKey,
    ScanReportConcept,
};
use omop_store::MappingStore;

use crate::config::DestinationConfig;
use crate::destination::DestinationResolver;

/// Synthesizes the full rule set for one concept-to-source-element
/// assignment.
///
/// Generation is pure: the complete set of rule keys is built in memory
/// and validated before anything is persisted, so a precondition failure
/// never leaves orphaned rules behind.
pub struct RuleGenerator<'a> {
    catalogue: &'a CdmCatalogue,
    config: &'a DestinationConfig,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(catalogue: &'a CdmCatalogue, config: &'a DestinationConfig) -> Self {
        RuleGenerator { catalogue, config }
    }

    /// Build the rule keys for an assignment.
    ///
    /// Preconditions, each a hard failure for this assignment only:
    /// the owning table must have person_id and date_event designated,
    /// and the concept's domain must resolve to an allowed destination.
    pub fn generate<S: MappingStore>(
        &self,
        store: &S,
        assignment: &ScanReportConcept,
        concept: &Concept,
    ) -> Result<Vec<RuleKey>> {
        let source_field = store.owning_field(&assignment.attached_to)?;
        let table = store.table(source_field.table)?;
        let scan_report = table.scan_report;

        let (person_field, date_field) = match (table.person_id, table.date_event) {
            (Some(person), Some(date)) => (person, date),
            _ => {
                return Err(MappingError::PersonOrDateNotSet {
                    table_name: table.name.clone(),
                });
            }
        };

        let destination = DestinationResolver::new(self.catalogue, self.config)
            .destination_for(concept)
            .ok_or_else(|| MappingError::UnsupportedDomain(concept.domain_id.to_lowercase()))?;
        let table_name = destination.table.name.clone();
        let domain = destination.domain.clone();

        let mut keys: Vec<RuleKey> = Vec::new();
        let mut push = |omop_field: &OmopField, source: FieldId| {
            keys.push(RuleKey {
                scan_report,
                omop_field: omop_field.id,
                source_field: source,
                concept: assignment.id,
            });
        };

        // Every destination row needs the person identity.
        push(self.dest_field(&table_name, "person_id")?, person_field);

        // One rule per datetime column of the destination table.
        for date_name in self.config.date_fields_for(&table_name) {
            push(self.dest_field(&table_name, date_name)?, date_field);
        }

        // Value columns. True measurement concepts record a numeric
        // result; "meas value" concepts are themselves the result.
        if destination.is_meas_value {
            push(
                self.dest_field(&table_name, self.config.meas_value_field())?,
                source_field.id,
            );
        } else if domain == "measurement" {
            push(self.dest_field(&table_name, "value_as_number")?, source_field.id);
        }

        push(
            self.dest_field(&table_name, &format!("{domain}_source_concept_id"))?,
            source_field.id,
        );
        push(
            self.dest_field(&table_name, &format!("{domain}_concept_id"))?,
            source_field.id,
        );
        // The source-value rule preserves the raw term; it is never
        // vocabulary-translated downstream.
        push(
            self.dest_field(&table_name, &format!("{domain}_source_value"))?,
            source_field.id,
        );

        if domain == "observation" {
            if source_field.is_numeric() {
                push(self.dest_field(&table_name, "value_as_number")?, source_field.id);
            } else if source_field.is_textual() {
                push(self.dest_field(&table_name, "value_as_string")?, source_field.id);
            }
        }

        debug!(
            assignment = assignment.id.value(),
            destination = %table_name,
            rules = keys.len(),
            "generated rule set"
        );
        Ok(keys)
    }

    /// Generate and persist the rule set for an assignment.
    ///
    /// All keys are built and validated first; the upsert pass only runs
    /// on a fully generated set, and upserting is idempotent on the rule
    /// key.
    pub fn generate_and_store<S: MappingStore>(
        &self,
        store: &mut S,
        assignment: &ScanReportConcept,
        concept: &Concept,
    ) -> Result<Vec<MappingRule>> {
        let keys = self.generate(store, assignment, concept)?;
        let mut rules = Vec::with_capacity(keys.len());
        for key in keys {
            rules.push(store.upsert_rule(key, true)?);
        }
        Ok(rules)
    }

    fn dest_field(&self, table: &str, field: &str) -> Result<&'a OmopField> {
        self.catalogue
            .field_in_table(table, field)
            .ok_or_else(|| MappingError::MissingDestinationField {
                table: table.to_string(),
                field: field.to_string(),
            })
    }
}
