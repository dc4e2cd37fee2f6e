#![deny(unsafe_code)]

pub mod resolver;
pub mod source;

pub use resolver::{ConceptResolver, concept_from_code};
pub use source::{InMemoryVocabulary, VocabularySnapshot, VocabularySource};
