//! Chain expression parsing.
//!
//! A chain is an arrow-separated sequence describing a causal/associative
//! path between codes, e.g. `alert fatigue -> enables -> missed alarms`.
//! Whether the odd elements are relation labels depends on the owning
//! field: a CHAIN field with a declared relation vocabulary alternates
//! code/relation/code; without one, every element is a code and a uniform
//! relation is synthesized between neighbors.

use crate::qda::template::FieldDefinition;

/// The relation label synthesized between codes of an unqualified chain.
pub const DEFAULT_RELATION: &str = "relates_to";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Simple,
    Qualified,
}

/// Parse result. Invariant: `relations.len() == codes.len() - 1` (or both
/// empty), `relations[i]` connecting `codes[i]` to `codes[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParse {
    pub codes: Vec<String>,
    pub relations: Vec<String>,
    pub kind: ChainKind,
}

impl ChainParse {
    fn empty() -> Self {
        Self {
            codes: Vec::new(),
            relations: Vec::new(),
            kind: ChainKind::Simple,
        }
    }

    /// The (from, relation, to) triplets described by this chain.
    pub fn triplets(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.relations.iter().enumerate().map(|(i, relation)| {
            (
                self.codes[i].as_str(),
                relation.as_str(),
                self.codes[i + 1].as_str(),
            )
        })
    }
}

/// Parse a chain according to the owning field's declared vocabulary.
pub fn parse_chain(text: &str, field: &FieldDefinition) -> ChainParse {
    parse_chain_with(text, &field.relations)
}

/// Parse a chain given just the relation vocabulary (empty = none).
pub fn parse_chain_with(text: &str, vocabulary: &[String]) -> ChainParse {
    let elements: Vec<&str> = text
        .split("->")
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .collect();
    if elements.is_empty() {
        return ChainParse::empty();
    }

    if !vocabulary.is_empty() {
        // Alternating interpretation: even indices are codes, odd indices
        // are relation labels.
        let mut codes = Vec::new();
        let mut relations = Vec::new();
        for (i, element) in elements.iter().enumerate() {
            if i % 2 == 0 {
                codes.push(element.to_string());
            } else {
                relations.push(element.to_string());
            }
        }
        // A trailing relation has nothing to connect to.
        relations.truncate(codes.len().saturating_sub(1));
        ChainParse {
            codes,
            relations,
            kind: ChainKind::Qualified,
        }
    } else {
        let codes: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
        let relations = vec![DEFAULT_RELATION.to_string(); codes.len().saturating_sub(1)];
        ChainParse {
            codes,
            relations,
            kind: ChainKind::Simple,
        }
    }
}
