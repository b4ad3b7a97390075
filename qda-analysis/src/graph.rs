//! Relation graph construction.
//!
//! Converts relation triplets into a Mermaid flowchart document with
//! deterministic, collision-free node identifiers. An empty triplet list
//! yields `None`, a deliberate "no graph" signal distinct from an error.
//!
//! Determinism contract: identifier assignment and node emission both
//! follow first-appearance order over the triplet list, so a given list
//! always produces byte-identical diagram source.

use std::collections::{HashMap, HashSet};

/// One directed relation between two codes. The label may be empty, which
/// renders as an unlabeled connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    pub from: String,
    pub to: String,
    pub label: String,
}

impl RelationEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
        }
    }
}

/// Flowchart orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopDown => "TD",
            Direction::LeftRight => "LR",
        }
    }
}

/// Build diagram source for one reference's relations, top-down.
pub fn build_graph(reference: &str, edges: &[RelationEdge]) -> Option<String> {
    build_graph_with(reference, edges, Direction::TopDown)
}

/// Build diagram source with an explicit orientation.
pub fn build_graph_with(
    reference: &str,
    edges: &[RelationEdge],
    direction: Direction,
) -> Option<String> {
    if edges.is_empty() {
        return None;
    }

    let mut ids = IdAssigner::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut node_lines: Vec<String> = Vec::new();
    let mut edge_lines: Vec<String> = Vec::new();

    for edge in edges {
        let from_id = ids.id_for(&edge.from).to_string();
        if seen.insert(&edge.from) {
            // A node first appearing as a chain origin has no incoming
            // edge yet, so it takes the default class.
            node_lines.push(format!(
                "    {}[\"{}\"]:::node",
                from_id,
                escape(&edge.from)
            ));
        }
        let to_id = ids.id_for(&edge.to).to_string();
        if seen.insert(&edge.to) {
            node_lines.push(format!(
                "    {}[\"{}\"]:::{}",
                to_id,
                escape(&edge.to),
                class_for(&edge.label)
            ));
        }

        let label = edge.label.trim();
        if label.is_empty() {
            edge_lines.push(format!("    {} --> {}", from_id, to_id));
        } else {
            edge_lines.push(format!("    {} -->|\"{}\"| {}", from_id, escape(label), to_id));
        }
    }

    let mut lines = Vec::with_capacity(node_lines.len() + edge_lines.len() + 5);
    lines.push(format!("graph {}", direction.as_str()));
    lines.push(format!("    %% relations for {}", reference));
    lines.extend(node_lines);
    lines.extend(edge_lines);
    lines.push("    classDef node fill:#e8e8e8,stroke:#555".to_string());
    lines.push("    classDef enable fill:#d9f2d9,stroke:#2e7d32".to_string());
    lines.push("    classDef constrain fill:#f9d6d5,stroke:#c62828".to_string());

    Some(lines.join("\n"))
}

/// Style class for a node, keyed on its incoming edge label. Matches the
/// English and Portuguese relation vocabularies.
fn class_for(label: &str) -> &'static str {
    let label = label.to_lowercase();
    if label.contains("enable") || label.contains("habilita") {
        "enable"
    } else if label.contains("constrain") || label.contains("restringe") {
        "constrain"
    } else {
        "node"
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Assigns each distinct node name a diagram-safe identifier, stable for
/// the lifetime of one graph build.
#[derive(Default)]
struct IdAssigner {
    assigned: HashMap<String, String>,
    taken: HashSet<String>,
}

impl IdAssigner {
    fn id_for(&mut self, name: &str) -> &str {
        if !self.assigned.contains_key(name) {
            let id = self.fresh_id(name);
            self.taken.insert(id.clone());
            self.assigned.insert(name.to_string(), id);
        }
        &self.assigned[name]
    }

    fn fresh_id(&self, name: &str) -> String {
        let mut base: String = name
            .chars()
            .map(|ch| if ch.is_alphanumeric() || ch == '_' { ch } else { '_' })
            .collect();
        if base.is_empty() {
            base.push('_');
        }
        if base.chars().next().is_some_and(|ch| ch.is_numeric()) {
            base.insert(0, 'n');
        }
        if !self.taken.contains(&base) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !self.taken.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}
