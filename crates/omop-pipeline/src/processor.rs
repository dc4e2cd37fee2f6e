//! Per-table work item processing.
//!
//! One work item covers one scan-report table and runs to completion:
//! vocabulary-driven concept building, cross-report reuse, then a
//! delete-then-regenerate rule refresh. Work items are independent and
//! may be redelivered; every step is idempotent against the store.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use omop_common::{chunk, paginate};
use omop_map::{DestinationConfig, RuleGenerator};
use omop_model::{
    CdmCatalogue, ConceptId, CreationType, MappingError, Result, ScanReportValue, SourceElement,
    SrConceptId, StandardConcept, TableId,
};
use omop_reuse::{ActivePolicy, ReuseMatcher};
use omop_store::MappingStore;
use omop_vocab::{ConceptResolver, VocabularySource};

use crate::dictionary::VocabularyDictionary;

/// An assignment rule generation skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedAssignment {
    pub assignment: SrConceptId,
    pub reason: String,
}

/// What one table work item did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableOutcome {
    pub vocab_concepts_created: usize,
    pub field_concepts_reused: usize,
    pub value_concepts_reused: usize,
    pub rules_deleted: usize,
    pub rules_written: usize,
    pub assignments_skipped: Vec<SkippedAssignment>,
}

/// Processes one scan-report table to completion.
pub struct TableProcessor<'a, V: VocabularySource, P: ActivePolicy> {
    vocab: &'a V,
    catalogue: &'a CdmCatalogue,
    config: &'a DestinationConfig,
    policy: &'a P,
    page_budget: usize,
}

impl<'a, V: VocabularySource, P: ActivePolicy> TableProcessor<'a, V, P> {
    pub fn new(
        vocab: &'a V,
        catalogue: &'a CdmCatalogue,
        config: &'a DestinationConfig,
        policy: &'a P,
    ) -> Self {
        TableProcessor {
            vocab,
            catalogue,
            config,
            policy,
            page_budget: omop_common::DEFAULT_MAX_CHARS,
        }
    }

    #[must_use]
    pub fn with_page_budget(mut self, page_budget: usize) -> Self {
        self.page_budget = page_budget;
        self
    }

    /// Run the full work item: build concepts from the dictionary, reuse
    /// prior decisions, and refresh the table's rules.
    ///
    /// Rule refresh is replace-in-full; concept building and reuse only
    /// ever add, with duplicates rejected by the store and skipped.
    pub fn process_table<S: MappingStore>(
        &self,
        store: &mut S,
        table_id: TableId,
        dictionary: &VocabularyDictionary,
    ) -> Result<TableOutcome> {
        let vocab_concepts_created = self.build_vocab_concepts(store, table_id, dictionary)?;

        let matcher = ReuseMatcher::new(self.policy);
        let field_concepts_reused = matcher.reuse_field_concepts(store, table_id)?.len();
        let value_concepts_reused = matcher.reuse_value_concepts(store, table_id)?.len();

        let (rules_deleted, rules_written, assignments_skipped) =
            self.refresh_rules(store, table_id)?;

        info!(
            table = table_id.value(),
            created = vocab_concepts_created,
            reused = field_concepts_reused + value_concepts_reused,
            rules = rules_written,
            "table processed"
        );
        Ok(TableOutcome {
            vocab_concepts_created,
            field_concepts_reused,
            value_concepts_reused,
            rules_deleted,
            rules_written,
            assignments_skipped,
        })
    }

    /// Match the table's values against their declared vocabularies and
    /// attach the standard concepts they resolve to.
    pub fn build_vocab_concepts<S: MappingStore>(
        &self,
        store: &mut S,
        table_id: TableId,
        dictionary: &VocabularyDictionary,
    ) -> Result<usize> {
        let table = store.table(table_id)?;
        let fields = store.fields_of(table_id)?;
        let field_names: BTreeMap<_, _> = fields
            .into_iter()
            .map(|field| (field.id, field.name))
            .collect();

        // Group values by their declared vocabulary; no vocabulary means
        // no lookup.
        let mut by_vocab: BTreeMap<String, Vec<ScanReportValue>> = BTreeMap::new();
        for value in store.values_of(table_id)? {
            let Some(field_name) = field_names.get(&value.field) else {
                continue;
            };
            if let Some(vocab_id) = dictionary.vocab_for(&table.name, field_name) {
                by_vocab.entry(vocab_id.to_string()).or_default().push(value);
            }
        }

        let mut batch: Vec<(ConceptId, SourceElement, CreationType)> = Vec::new();
        for (vocab_id, values) in by_vocab {
            debug!(vocabulary = %vocab_id, values = values.len(), "matching codes");
            batch.extend(self.match_vocab_values(&vocab_id, &values)?);
        }

        // Bulk submission runs under both the per-call size budget and a
        // calls-per-burst cap.
        let mut created = 0usize;
        for burst in chunk(batch, self.page_budget, omop_common::DEFAULT_PAGES_PER_CHUNK)? {
            for page in burst {
                created += store.attach_concepts(page)?.len();
            }
        }
        Ok(created)
    }

    /// Resolve one vocabulary's worth of values to standard concept ids.
    fn match_vocab_values(
        &self,
        vocab_id: &str,
        values: &[ScanReportValue],
    ) -> Result<Vec<(ConceptId, SourceElement, CreationType)>> {
        // Batch code lookup under the page budget.
        let codes: Vec<String> = values.iter().map(|value| value.value.clone()).collect();
        let mut by_code: BTreeMap<String, (ConceptId, StandardConcept)> = BTreeMap::new();
        for page in paginate(codes, self.page_budget)? {
            for concept in self.vocab.concepts_by_code(vocab_id, &page)? {
                by_code.insert(
                    concept.concept_code.clone(),
                    (concept.concept_id, concept.standard_concept),
                );
            }
        }

        // Split matched values into already-standard and to-resolve.
        let mut matched: Vec<(&ScanReportValue, ConceptId, StandardConcept)> = Vec::new();
        for value in values {
            if let Some((concept_id, standard)) = by_code.get(&value.value) {
                matched.push((value, *concept_id, *standard));
            }
        }
        let nonstandard: Vec<ConceptId> = matched
            .iter()
            .filter(|(_, _, standard)| !standard.is_standard())
            .map(|(_, concept_id, _)| *concept_id)
            .collect();
        debug!(
            vocabulary = %vocab_id,
            matched = matched.len(),
            nonstandard = nonstandard.len(),
            "codes matched"
        );

        let resolver = ConceptResolver::new(self.vocab).with_page_budget(self.page_budget);
        let standard_map = resolver.resolve_standard_batch(&nonstandard)?;

        let mut assignments = Vec::new();
        for (value, concept_id, standard) in matched {
            let element = SourceElement::Value(value.id);
            if standard.is_standard() {
                assignments.push((concept_id, element, CreationType::Vocab));
            } else if let Some(targets) = standard_map.get(&concept_id) {
                // A non-standard source may map to several standard
                // concepts; each becomes its own assignment.
                for target in targets {
                    assignments.push((*target, element, CreationType::Vocab));
                }
            } else {
                warn!(
                    concept_id = concept_id.value(),
                    value = value.id.value(),
                    "no standard concept found; value left unmapped"
                );
            }
        }
        Ok(assignments)
    }

    /// Replace the table's rules from its current concept assignments.
    ///
    /// Fails up front with `PersonOrDateNotSet` before touching existing
    /// rules; per-assignment destination failures are skipped with the
    /// rest of the table still processed.
    pub fn refresh_rules<S: MappingStore>(
        &self,
        store: &mut S,
        table_id: TableId,
    ) -> Result<(usize, usize, Vec<SkippedAssignment>)> {
        let table = store.table(table_id)?;
        if table.person_id.is_none() || table.date_event.is_none() {
            return Err(MappingError::PersonOrDateNotSet {
                table_name: table.name,
            });
        }

        let deleted = store.delete_rules_for_table(table_id)?;
        let generator = RuleGenerator::new(self.catalogue, self.config);

        let mut written = 0usize;
        let mut skipped = Vec::new();
        for assignment in store.concepts_for_table(table_id)? {
            let Some(concept) = self.vocab.concept(assignment.concept)? else {
                warn!(
                    concept_id = assignment.concept.value(),
                    "assigned concept missing from vocabulary"
                );
                skipped.push(SkippedAssignment {
                    assignment: assignment.id,
                    reason: format!("concept {} not in vocabulary", assignment.concept),
                });
                continue;
            };
            match generator.generate_and_store(store, &assignment, &concept) {
                Ok(rules) => written += rules.len(),
                Err(
                    error @ (MappingError::UnsupportedDomain(_)
                    | MappingError::MissingDestinationField { .. }),
                ) => {
                    warn!(
                        assignment = assignment.id.value(),
                        %error,
                        "rule generation skipped"
                    );
                    skipped.push(SkippedAssignment {
                        assignment: assignment.id,
                        reason: error.to_string(),
                    });
                }
                Err(error) => return Err(error),
            }
        }
        Ok((deleted, written, skipped))
    }
}
