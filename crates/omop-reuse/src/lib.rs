#![deny(unsafe_code)]

pub mod analysis;
pub mod matcher;

pub use analysis::{
    AnalysisReport, AncestorDescendantAnalyzer, ConceptAnalysis, RelatedConcept, SourceLocation,
};
pub use matcher::{ActivePolicy, FlaggedActive, ReuseMatcher};
