#![deny(unsafe_code)]

pub mod csv;
pub mod error;
pub mod graph;
pub mod json;
pub mod list;

pub use error::{ExportError, Result};
pub use graph::{GraphEdge, GraphNode, NodeKind, ProvenanceGraph, build_graph};
pub use json::{ExportMetadata, RulesDocument, TargetSpec, build_document};
pub use list::{RuleRow, TermMapping, build_rule_rows};

pub use crate::csv::{CSV_HEADERS, write_rules_csv};
