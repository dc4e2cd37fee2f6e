//! Scan report entities.
//!
//! A scan report is the structural description of one source database as
//! produced by an external profiling tool: tables, their fields, and the
//! distinct values observed per field with frequencies. Concepts are
//! attached to fields or values; rule generation consumes those
//! attachments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ConceptId, FieldId, ScanReportId, SrConceptId, TableId, ValueId};

/// One uploaded scan report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: ScanReportId,
    /// Dataset label carried into export metadata.
    pub dataset: String,
    pub name: String,
    /// Whether this report participates in cross-report reuse. The reuse
    /// matcher itself depends only on an injected predicate; this flag
    /// drives the default one.
    pub active: bool,
}

/// One table of a scan report.
///
/// `person_id` and `date_event` designate which source fields carry the
/// person identity and the event date. Both must be set before any rule
/// can be generated for the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReportTable {
    pub id: TableId,
    pub scan_report: ScanReportId,
    pub name: String,
    pub person_id: Option<FieldId>,
    pub date_event: Option<FieldId>,
}

/// One field (column) of a scan report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReportField {
    pub id: FieldId,
    pub table: TableId,
    pub name: String,
    /// Declared source type, as reported by the profiler (e.g. `"INT"`,
    /// `"VARCHAR"`). Free-form; interpreted only for the observation
    /// value-column rules.
    pub type_column: String,
}

impl ScanReportField {
    /// Whether the declared source type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.type_column.trim().to_lowercase().as_str(),
            "int" | "tinyint" | "smallint" | "bigint" | "real" | "float" | "double" | "decimal"
                | "numeric"
        )
    }

    /// Whether the declared source type is textual.
    pub fn is_textual(&self) -> bool {
        matches!(
            self.type_column.trim().to_lowercase().as_str(),
            "varchar" | "nvarchar" | "char" | "nchar" | "text" | "string"
        )
    }
}

/// One observed value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReportValue {
    pub id: ValueId,
    pub field: FieldId,
    pub value: String,
    pub value_description: Option<String>,
    pub frequency: u32,
}

/// What a concept is attached to.
///
/// Replaces the runtime content-type inspection of a generic link with a
/// tagged union; owning field/table resolution is a match over the
/// variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceElement {
    Field(FieldId),
    Value(ValueId),
}

impl SourceElement {
    pub fn kind(&self) -> ContentKind {
        match self {
            SourceElement::Field(_) => ContentKind::Field,
            SourceElement::Value(_) => ContentKind::Value,
        }
    }
}

impl fmt::Display for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceElement::Field(id) => write!(f, "field {id}"),
            SourceElement::Value(id) => write!(f, "value {id}"),
        }
    }
}

/// The two kinds of source element a concept can be attached to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Field,
    Value,
}

/// How a concept assignment came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreationType {
    /// Attached by a user.
    Manual,
    /// Matched from a vocabulary dictionary during table processing.
    Vocab,
    /// Copied from a structurally identical element in another report.
    Reuse,
}

impl fmt::Display for CreationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CreationType::Manual => "Manual",
            CreationType::Vocab => "Vocab",
            CreationType::Reuse => "Reuse",
        };
        f.write_str(label)
    }
}

/// A concept attached to a scan report field or value.
///
/// At most one may exist per `(concept, attached_to)` pair; the store
/// enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReportConcept {
    pub id: SrConceptId,
    pub concept: ConceptId,
    pub attached_to: SourceElement,
    pub creation_type: CreationType,
}
