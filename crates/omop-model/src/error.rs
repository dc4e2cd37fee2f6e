use thiserror::Error;

use crate::ids::ConceptId;
use crate::scan_report::SourceElement;

/// Failure taxonomy shared across the mapping engine.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A `(code, vocabulary)` lookup missed. Reported to the caller; no
    /// rule is created.
    #[error("concept code {code:?} not found in vocabulary {vocabulary:?}")]
    ConceptNotFound { vocabulary: String, code: String },

    /// A non-standard concept has no usable "Maps to" target. Covers the
    /// self-mapping degenerate case, which is never a valid resolution.
    #[error("no standard concept found for concept {0}")]
    NoStandardConceptFound(ConceptId),

    /// The owning table has no person_id or date_event designated. Blocks
    /// all rule generation for that table until fixed by a user.
    #[error("person_id or date_event not set on table {table_name:?}")]
    PersonOrDateNotSet { table_name: String },

    /// The concept's clinical domain has no implemented destination.
    /// Skips this one assignment; siblings proceed.
    #[error("domain {0:?} has no implemented destination table")]
    UnsupportedDomain(String),

    /// Uniqueness violation on `(concept, attached element)`. A
    /// client-correctable validation error, not a server fault.
    #[error("concept {concept} is already attached to {element}")]
    DuplicateConceptAssignment {
        concept: ConceptId,
        element: SourceElement,
    },

    /// A referenced entity does not exist in the store.
    #[error("unknown {kind} id {id}")]
    UnknownId { kind: &'static str, id: i64 },

    /// The catalogue is missing a field rule generation requires.
    #[error("destination table {table:?} has no field {field:?}")]
    MissingDestinationField { table: String, field: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MappingError {
    pub fn unknown_id(kind: &'static str, id: impl Into<i64>) -> Self {
        MappingError::UnknownId {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
