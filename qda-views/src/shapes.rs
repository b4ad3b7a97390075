//! Normalized view-model shapes.
//!
//! This is the stable contract consumed by every explorer surface, and
//! the wire format of the CLI's JSON output. Field names serialize in
//! camelCase. All line/column values are zero-based; whatever convention
//! an upstream source uses, the conversion happens before data reaches
//! these types.

use serde::{Deserialize, Serialize};

/// One appearance of a bibliographic reference in an annotation file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceOccurrence {
    pub file: String,
    pub line: usize,
    pub item_count: usize,
}

/// A bibliographic reference with its annotation volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub bibref: String,
    pub item_count: usize,
    pub occurrences: Vec<ReferenceOccurrence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeOccurrence {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
    pub field: String,
}

/// A code with every place it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub code: String,
    pub usage_count: usize,
    pub ontology_defined: bool,
    pub occurrences: Vec<CodeOccurrence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationTriplet {
    pub from: String,
    pub to: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Chain interpretation that produced the triplet: "simple" or
    /// "qualified".
    #[serde(rename = "type")]
    pub kind: String,
}

/// All triplets sharing one relation label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationGroup {
    pub relation: String,
    pub triplets: Vec<RelationTriplet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationGraph {
    pub diagram_source: String,
}

/// One node of the ontology topic tree. Recursive, finite depth, no
/// cycles by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicNode {
    pub name: String,
    pub level: usize,
    pub file: String,
    pub line: usize,
    pub children: Vec<TopicNode>,
}

impl TopicNode {
    pub fn leaf(name: impl Into<String>, level: usize, file: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            level,
            file: file.into(),
            line,
            children: Vec::new(),
        }
    }

    /// Fold a flat, depth-annotated node list into a forest. Each node
    /// becomes a child of the nearest preceding node with a smaller
    /// level; level-skips attach to that same ancestor.
    pub fn build_tree(flat: Vec<TopicNode>) -> Vec<TopicNode> {
        let mut roots: Vec<TopicNode> = Vec::new();
        let mut open: Vec<TopicNode> = Vec::new();

        fn close_one(open: &mut Vec<TopicNode>, roots: &mut Vec<TopicNode>) {
            if let Some(done) = open.pop() {
                match open.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => roots.push(done),
                }
            }
        }

        for node in flat {
            while open.last().is_some_and(|ancestor| ancestor.level >= node.level) {
                close_one(&mut open, &mut roots);
            }
            open.push(node);
        }
        while !open.is_empty() {
            close_one(&mut open, &mut roots);
        }
        roots
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyOccurrence {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
    pub field: String,
    pub item_name: String,
}

/// A code viewed through the ontology: whether it is defined there, and
/// where it is used in annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyAnnotation {
    pub code: String,
    pub ontology_defined: bool,
    pub ontology_file: Option<String>,
    pub ontology_line: Option<usize>,
    pub occurrences: Vec<OntologyOccurrence>,
}
