//! Abstract vocabulary operations and the in-memory snapshot backing.
//!
//! The engine never assumes how vocabulary data is reached — a REST
//! filter endpoint, RPC, or direct store access all fit behind
//! [`VocabularySource`]. Callers that talk to size-limited batch
//! endpoints split their id sets with `omop_common::paginate` before
//! dispatch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use omop_model::{Concept, ConceptAncestor, ConceptId, ConceptRelationship, Result};

/// Read access to vocabulary reference data.
pub trait VocabularySource {
    /// Concepts matching any of `codes` within one vocabulary.
    fn concepts_by_code(&self, vocabulary_id: &str, codes: &[String]) -> Result<Vec<Concept>>;

    /// Concepts by id; missing ids are simply absent from the result.
    fn concepts(&self, ids: &[ConceptId]) -> Result<Vec<Concept>>;

    /// A single concept by id.
    fn concept(&self, id: ConceptId) -> Result<Option<Concept>> {
        Ok(self.concepts(&[id])?.into_iter().next())
    }

    /// Relationship rows with `concept_id_1` in `ids` and the given
    /// relationship.
    fn relationships(
        &self,
        ids: &[ConceptId],
        relationship_id: &str,
    ) -> Result<Vec<ConceptRelationship>>;

    /// Ancestor rows for a descendant (its ancestors).
    fn ancestors_of(&self, descendant: ConceptId) -> Result<Vec<ConceptAncestor>>;

    /// Ancestor rows for an ancestor (its descendants).
    fn descendants_of(&self, ancestor: ConceptId) -> Result<Vec<ConceptAncestor>>;
}

/// Serializable vocabulary snapshot, the CLI's on-disk input format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularySnapshot {
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relationships: Vec<ConceptRelationship>,
    #[serde(default)]
    pub ancestors: Vec<ConceptAncestor>,
}

/// In-memory [`VocabularySource`] built from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVocabulary {
    concepts: BTreeMap<ConceptId, Concept>,
    code_index: BTreeMap<(String, String), ConceptId>,
    relationships: Vec<ConceptRelationship>,
    ancestors: Vec<ConceptAncestor>,
}

impl InMemoryVocabulary {
    pub fn new(snapshot: VocabularySnapshot) -> Self {
        let mut concepts = BTreeMap::new();
        let mut code_index = BTreeMap::new();
        for concept in snapshot.concepts {
            code_index.insert(
                (concept.vocabulary_id.clone(), concept.concept_code.clone()),
                concept.concept_id,
            );
            concepts.insert(concept.concept_id, concept);
        }
        InMemoryVocabulary {
            concepts,
            code_index,
            relationships: snapshot.relationships,
            ancestors: snapshot.ancestors,
        }
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl From<VocabularySnapshot> for InMemoryVocabulary {
    fn from(snapshot: VocabularySnapshot) -> Self {
        InMemoryVocabulary::new(snapshot)
    }
}

impl VocabularySource for InMemoryVocabulary {
    fn concepts_by_code(&self, vocabulary_id: &str, codes: &[String]) -> Result<Vec<Concept>> {
        let mut found = Vec::new();
        for code in codes {
            let key = (vocabulary_id.to_string(), code.clone());
            if let Some(id) = self.code_index.get(&key)
                && let Some(concept) = self.concepts.get(id)
            {
                found.push(concept.clone());
            }
        }
        Ok(found)
    }

    fn concepts(&self, ids: &[ConceptId]) -> Result<Vec<Concept>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.concepts.get(id).cloned())
            .collect())
    }

    fn relationships(
        &self,
        ids: &[ConceptId],
        relationship_id: &str,
    ) -> Result<Vec<ConceptRelationship>> {
        Ok(self
            .relationships
            .iter()
            .filter(|edge| {
                edge.relationship_id == relationship_id && ids.contains(&edge.concept_id_1)
            })
            .cloned()
            .collect())
    }

    fn ancestors_of(&self, descendant: ConceptId) -> Result<Vec<ConceptAncestor>> {
        Ok(self
            .ancestors
            .iter()
            .filter(|row| row.descendant_concept_id == descendant)
            .cloned()
            .collect())
    }

    fn descendants_of(&self, ancestor: ConceptId) -> Result<Vec<ConceptAncestor>> {
        Ok(self
            .ancestors
            .iter()
            .filter(|row| row.ancestor_concept_id == ancestor)
            .cloned()
            .collect())
    }
}
