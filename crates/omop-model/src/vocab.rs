//! OMOP vocabulary reference entities.
//!
//! These are immutable reference data shipped with a vocabulary release:
//! concepts, the directed relationship graph between them, and the
//! ancestor/descendant closure. None of them are ever written by this
//! system.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::ConceptId;

/// The relationship used for non-standard to standard resolution.
pub const MAPS_TO: &str = "Maps to";

/// Standardness flag of a vocabulary concept.
///
/// In vocabulary releases this is the single-character `standard_concept`
/// column: `"S"` for standard, `"C"` for classification-only, empty for
/// non-standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardConcept {
    /// The canonical representative used in `*_concept_id` fields.
    Standard,
    /// Must be translated via a "Maps to" relationship before use.
    NonStandard,
    /// Classification concepts participate in the hierarchy but are not
    /// valid mapping targets.
    Classification,
}

impl StandardConcept {
    pub fn is_standard(&self) -> bool {
        matches!(self, StandardConcept::Standard)
    }

    /// The single-character vocabulary flag, `None` for non-standard.
    pub fn as_flag(&self) -> Option<&'static str> {
        match self {
            StandardConcept::Standard => Some("S"),
            StandardConcept::Classification => Some("C"),
            StandardConcept::NonStandard => None,
        }
    }

    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("S") => StandardConcept::Standard,
            Some("C") => StandardConcept::Classification,
            _ => StandardConcept::NonStandard,
        }
    }
}

impl Serialize for StandardConcept {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_flag() {
            Some(flag) => serializer.serialize_some(flag),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for StandardConcept {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flag: Option<String> = Option::deserialize(deserializer)?;
        Ok(StandardConcept::from_flag(flag.as_deref()))
    }
}

impl fmt::Display for StandardConcept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag().unwrap_or(""))
    }
}

/// A vocabulary concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,
    pub concept_name: String,
    pub domain_id: String,
    pub vocabulary_id: String,
    pub concept_class_id: String,
    pub standard_concept: StandardConcept,
    pub concept_code: String,
    pub valid_start_date: NaiveDate,
    pub valid_end_date: NaiveDate,
}

impl Concept {
    /// True on `as_of` per the vocabulary validity convention: valid from
    /// the start date inclusive up to the end date exclusive.
    pub fn is_valid_on(&self, as_of: NaiveDate) -> bool {
        self.valid_start_date <= as_of && as_of < self.valid_end_date
    }
}

/// A directed relationship edge between two concepts.
///
/// May contain self-loops; "Maps to" edges may be absent entirely for some
/// non-standard concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRelationship {
    pub concept_id_1: ConceptId,
    pub concept_id_2: ConceptId,
    pub relationship_id: String,
}

impl ConceptRelationship {
    /// A self-loop maps a concept onto itself and is never a usable
    /// resolution target.
    pub fn is_self_loop(&self) -> bool {
        self.concept_id_1 == self.concept_id_2
    }
}

/// A transitive-closure edge of the concept hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptAncestor {
    pub ancestor_concept_id: ConceptId,
    pub descendant_concept_id: ConceptId,
    pub min_levels_of_separation: u32,
    pub max_levels_of_separation: u32,
}
