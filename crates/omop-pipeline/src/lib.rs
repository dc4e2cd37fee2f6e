#![deny(unsafe_code)]

pub mod dictionary;
pub mod processor;

pub use dictionary::VocabularyDictionary;
pub use processor::{SkippedAssignment, TableOutcome, TableProcessor};
