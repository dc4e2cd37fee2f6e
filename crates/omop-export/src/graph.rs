//! Rule-provenance graph.
//!
//! A serializable node/edge structure linking destination tables to
//! their fields and on to the source fields and tables that feed them.
//! Rendering is left to consumers; this is the data contract only.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::list::RuleRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    DestinationTable,
    DestinationField,
    SourceField,
    SourceTable,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Set on destination-to-source edges that carry a term mapping.
    pub term_mapped: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvenanceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Build the provenance graph from a flattened listing. Nodes and edges
/// are deduplicated; several rules may share any part of the path.
pub fn build_graph(rows: &[RuleRow]) -> ProvenanceGraph {
    let mut nodes = BTreeSet::new();
    let mut edges = BTreeSet::new();

    for row in rows {
        let dest_table = format!("dest:{}", row.destination_table);
        let dest_field = format!("dest:{}.{}", row.destination_table, row.destination_field);
        let source_field = format!("source:{}.{}", row.source_table, row.source_field);
        let source_table = format!("source:{}", row.source_table);

        nodes.insert(GraphNode {
            id: dest_table.clone(),
            label: row.destination_table.clone(),
            kind: NodeKind::DestinationTable,
        });
        nodes.insert(GraphNode {
            id: dest_field.clone(),
            label: row.destination_field.clone(),
            kind: NodeKind::DestinationField,
        });
        nodes.insert(GraphNode {
            id: source_field.clone(),
            label: row.source_field.clone(),
            kind: NodeKind::SourceField,
        });
        nodes.insert(GraphNode {
            id: source_table.clone(),
            label: row.source_table.clone(),
            kind: NodeKind::SourceTable,
        });

        edges.insert(GraphEdge {
            from: dest_table,
            to: dest_field.clone(),
            term_mapped: false,
        });
        edges.insert(GraphEdge {
            from: dest_field,
            to: source_field.clone(),
            term_mapped: row.term_mapping.is_some(),
        });
        edges.insert(GraphEdge {
            from: source_field,
            to: source_table,
            term_mapped: false,
        });
    }

    ProvenanceGraph {
        nodes: nodes.into_iter().collect(),
        edges: edges.into_iter().collect(),
    }
}
