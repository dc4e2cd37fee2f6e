//! Non-standard to standard concept resolution.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use omop_common::paginate;
use omop_model::{Concept, ConceptId, MAPS_TO, MappingError, Result};

use crate::source::VocabularySource;

/// Resolves concepts to their standard representatives over the
/// "Maps to" relationship graph.
pub struct ConceptResolver<'a, S: VocabularySource> {
    source: &'a S,
    /// Character budget for batched relationship lookups.
    page_budget: usize,
}

impl<'a, S: VocabularySource> ConceptResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        ConceptResolver {
            source,
            page_budget: omop_common::DEFAULT_MAX_CHARS,
        }
    }

    #[must_use]
    pub fn with_page_budget(mut self, page_budget: usize) -> Self {
        self.page_budget = page_budget;
        self
    }

    /// Resolve one concept to the standard concept it maps to.
    ///
    /// Standard concepts are fixed points. For non-standard concepts the
    /// "Maps to" edges are followed; a self-loop is never a usable
    /// resolution. If no edge reaches a standard concept the resolution
    /// fails with [`MappingError::NoStandardConceptFound`] and the caller
    /// must leave the assignment unresolved.
    pub fn resolve_standard(&self, concept: &Concept) -> Result<Concept> {
        if concept.standard_concept.is_standard() {
            return Ok(concept.clone());
        }

        let edges = self.source.relationships(&[concept.concept_id], MAPS_TO)?;
        let mut resolved: Vec<Concept> = Vec::new();
        for edge in &edges {
            if edge.is_self_loop() {
                warn!(
                    concept_id = edge.concept_id_1.value(),
                    "non-standard concept maps to itself"
                );
                continue;
            }
            if let Some(target) = self.source.concept(edge.concept_id_2)?
                && target.standard_concept.is_standard()
            {
                resolved.push(target);
            }
        }

        match resolved.len() {
            0 => Err(MappingError::NoStandardConceptFound(concept.concept_id)),
            1 => Ok(resolved.remove(0)),
            n => {
                // Duplicate "Maps to" edges exist in the wild; surface the
                // ambiguity rather than silently collapsing it.
                warn!(
                    concept_id = concept.concept_id.value(),
                    candidates = n,
                    "multiple standard targets for non-standard concept; using first"
                );
                Ok(resolved.remove(0))
            }
        }
    }

    /// Resolve many source concepts at once.
    ///
    /// Issues one relationship lookup per page of the full id set, then
    /// one concept lookup for the targets, and groups the standard
    /// targets per source id (order-preserving, deduplicated). Sources
    /// with no usable edge are absent from the map; a bad item never
    /// aborts the batch.
    pub fn resolve_standard_batch(
        &self,
        ids: &[ConceptId],
    ) -> Result<BTreeMap<ConceptId, Vec<ConceptId>>> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut edges = Vec::new();
        for page in paginate(ids.to_vec(), self.page_budget)? {
            edges.extend(self.source.relationships(&page, MAPS_TO)?);
        }

        // Only edges with a trail to follow: self-loops resolve nothing.
        edges.retain(|edge| !edge.is_self_loop());

        let target_ids: Vec<ConceptId> = edges.iter().map(|edge| edge.concept_id_2).collect();
        let mut standard_targets = BTreeSet::new();
        for page in paginate(target_ids, self.page_budget)? {
            for target in self.source.concepts(&page)? {
                if target.standard_concept.is_standard() {
                    standard_targets.insert(target.concept_id);
                }
            }
        }

        let mut grouped: BTreeMap<ConceptId, Vec<ConceptId>> = BTreeMap::new();
        for edge in &edges {
            if standard_targets.contains(&edge.concept_id_2) {
                let targets = grouped.entry(edge.concept_id_1).or_default();
                if !targets.contains(&edge.concept_id_2) {
                    targets.push(edge.concept_id_2);
                }
            }
        }
        Ok(grouped)
    }
}

/// Look up a `(code, vocabulary)` pair and resolve it to its standard
/// concept in one step.
///
/// Returns the source concept alongside the standard one; for a standard
/// source the two are identical.
pub fn concept_from_code<S: VocabularySource>(
    source: &S,
    vocabulary_id: &str,
    concept_code: &str,
) -> Result<(Concept, Concept)> {
    let codes = vec![concept_code.to_string()];
    let found = source
        .concepts_by_code(vocabulary_id, &codes)?
        .into_iter()
        .next()
        .ok_or_else(|| MappingError::ConceptNotFound {
            vocabulary: vocabulary_id.to_string(),
            code: concept_code.to_string(),
        })?;
    let standard = ConceptResolver::new(source).resolve_standard(&found)?;
    Ok((found, standard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemoryVocabulary, VocabularySnapshot};
    use chrono::NaiveDate;
    use omop_model::{ConceptRelationship, StandardConcept};

    fn concept(id: i64, standard: StandardConcept) -> Concept {
        Concept {
            concept_id: ConceptId::new(id),
            concept_name: format!("Concept {id}"),
            domain_id: "Condition".to_string(),
            vocabulary_id: "SNOMED".to_string(),
            concept_class_id: "Clinical Finding".to_string(),
            standard_concept: standard,
            concept_code: format!("code-{id}"),
            valid_start_date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            valid_end_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
        }
    }

    fn maps_to(from: i64, to: i64) -> ConceptRelationship {
        ConceptRelationship {
            concept_id_1: ConceptId::new(from),
            concept_id_2: ConceptId::new(to),
            relationship_id: MAPS_TO.to_string(),
        }
    }

    fn vocabulary(
        concepts: Vec<Concept>,
        relationships: Vec<ConceptRelationship>,
    ) -> InMemoryVocabulary {
        InMemoryVocabulary::new(VocabularySnapshot {
            concepts,
            relationships,
            ancestors: Vec::new(),
        })
    }

    #[test]
    fn standard_concept_is_a_fixed_point() {
        let vocab = vocabulary(vec![concept(1, StandardConcept::Standard)], Vec::new());
        let resolver = ConceptResolver::new(&vocab);
        let input = concept(1, StandardConcept::Standard);
        let resolved = resolver.resolve_standard(&input).unwrap();
        assert_eq!(resolved, input);
    }

    #[test]
    fn non_standard_resolves_through_maps_to() {
        let vocab = vocabulary(
            vec![
                concept(10, StandardConcept::NonStandard),
                concept(20, StandardConcept::Standard),
            ],
            vec![maps_to(10, 20)],
        );
        let resolver = ConceptResolver::new(&vocab);
        let resolved = resolver
            .resolve_standard(&concept(10, StandardConcept::NonStandard))
            .unwrap();
        assert_eq!(resolved.concept_id, ConceptId::new(20));
    }

    #[test]
    fn self_map_is_rejected() {
        let vocab = vocabulary(
            vec![concept(10, StandardConcept::NonStandard)],
            vec![maps_to(10, 10)],
        );
        let resolver = ConceptResolver::new(&vocab);
        let result = resolver.resolve_standard(&concept(10, StandardConcept::NonStandard));
        assert!(matches!(
            result,
            Err(MappingError::NoStandardConceptFound(id)) if id == ConceptId::new(10)
        ));
    }

    #[test]
    fn missing_relationship_fails() {
        let vocab = vocabulary(vec![concept(10, StandardConcept::NonStandard)], Vec::new());
        let resolver = ConceptResolver::new(&vocab);
        let result = resolver.resolve_standard(&concept(10, StandardConcept::NonStandard));
        assert!(matches!(
            result,
            Err(MappingError::NoStandardConceptFound(_))
        ));
    }

    #[test]
    fn non_standard_target_is_not_usable() {
        let vocab = vocabulary(
            vec![
                concept(10, StandardConcept::NonStandard),
                concept(20, StandardConcept::Classification),
            ],
            vec![maps_to(10, 20)],
        );
        let resolver = ConceptResolver::new(&vocab);
        let result = resolver.resolve_standard(&concept(10, StandardConcept::NonStandard));
        assert!(matches!(
            result,
            Err(MappingError::NoStandardConceptFound(_))
        ));
    }

    #[test]
    fn batch_groups_all_standard_targets() {
        let vocab = vocabulary(
            vec![
                concept(10, StandardConcept::NonStandard),
                concept(11, StandardConcept::NonStandard),
                concept(20, StandardConcept::Standard),
                concept(21, StandardConcept::Standard),
                concept(22, StandardConcept::NonStandard),
            ],
            vec![
                maps_to(10, 20),
                maps_to(10, 21),
                maps_to(10, 21), // duplicate edge collapses
                maps_to(11, 22), // non-standard target drops out
                maps_to(11, 11), // self-loop drops out
            ],
        );
        let resolver = ConceptResolver::new(&vocab);
        let grouped = resolver
            .resolve_standard_batch(&[ConceptId::new(10), ConceptId::new(11)])
            .unwrap();
        assert_eq!(
            grouped.get(&ConceptId::new(10)),
            Some(&vec![ConceptId::new(20), ConceptId::new(21)])
        );
        assert!(!grouped.contains_key(&ConceptId::new(11)));
    }

    #[test]
    fn batch_survives_tiny_page_budget() {
        let concepts: Vec<Concept> = (1..=30)
            .map(|id| concept(id, StandardConcept::NonStandard))
            .chain((101..=130).map(|id| concept(id, StandardConcept::Standard)))
            .collect();
        let relationships: Vec<ConceptRelationship> =
            (1..=30).map(|id| maps_to(id, id + 100)).collect();
        let vocab = vocabulary(concepts, relationships);
        let resolver = ConceptResolver::new(&vocab).with_page_budget(16);
        let ids: Vec<ConceptId> = (1..=30).map(ConceptId::new).collect();
        let grouped = resolver.resolve_standard_batch(&ids).unwrap();
        assert_eq!(grouped.len(), 30);
        for id in 1..=30 {
            assert_eq!(
                grouped.get(&ConceptId::new(id)),
                Some(&vec![ConceptId::new(id + 100)])
            );
        }
    }

    #[test]
    fn code_lookup_resolves_to_standard() {
        let vocab = vocabulary(
            vec![
                concept(10, StandardConcept::NonStandard),
                concept(20, StandardConcept::Standard),
            ],
            vec![maps_to(10, 20)],
        );
        let (found, standard) = concept_from_code(&vocab, "SNOMED", "code-10").unwrap();
        assert_eq!(found.concept_id, ConceptId::new(10));
        assert_eq!(standard.concept_id, ConceptId::new(20));

        let miss = concept_from_code(&vocab, "SNOMED", "nope");
        assert!(matches!(miss, Err(MappingError::ConceptNotFound { .. })));
    }
}
