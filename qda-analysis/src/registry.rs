//! Field classification.
//!
//! The registry is the single choke point deciding what counts as a
//! "code field", a "chain field", and so on, so that every explorer and
//! extraction path agrees. It is rebuilt whenever the template changes
//! and never mutated in place.

use std::collections::HashMap;

use qda_parser::qda::{
    default_field_definitions, parse_template, FieldDefinition, FieldScope, FieldType,
};

/// Read-only lookup over field definitions.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: HashMap<String, FieldDefinition>,
}

impl FieldRegistry {
    /// Build from parsed definitions. An empty list falls back to the
    /// built-in default field set.
    pub fn new(definitions: Vec<FieldDefinition>) -> Self {
        let definitions = if definitions.is_empty() {
            default_field_definitions()
        } else {
            definitions
        };
        Self {
            fields: definitions
                .into_iter()
                .map(|def| (def.name.clone(), def))
                .collect(),
        }
    }

    /// Parse template text and build; unparseable templates yield the
    /// default field set.
    pub fn from_template_text(text: &str) -> Self {
        Self::new(parse_template(text))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn is_code_field(&self, name: &str) -> bool {
        self.field(name)
            .is_some_and(|def| def.field_type == FieldType::Code)
    }

    pub fn is_chain_field(&self, name: &str) -> bool {
        self.field(name)
            .is_some_and(|def| def.field_type == FieldType::Chain)
    }

    /// Whether a field is a CHAIN field with a declared relation
    /// vocabulary.
    pub fn has_relations(&self, name: &str) -> bool {
        self.field(name).is_some_and(FieldDefinition::has_relations)
    }

    /// Fields of one type and scope, sorted by name for deterministic
    /// iteration.
    pub fn fields_of(&self, field_type: &FieldType, scope: FieldScope) -> Vec<&FieldDefinition> {
        let mut matches: Vec<&FieldDefinition> = self
            .fields
            .values()
            .filter(|def| def.field_type == *field_type && def.scope == scope)
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    pub fn item_code_fields(&self) -> Vec<&FieldDefinition> {
        self.fields_of(&FieldType::Code, FieldScope::Item)
    }

    pub fn item_chain_fields(&self) -> Vec<&FieldDefinition> {
        self.fields_of(&FieldType::Chain, FieldScope::Item)
    }

    pub fn ontology_topic_fields(&self) -> Vec<&FieldDefinition> {
        self.fields_of(&FieldType::Topic, FieldScope::Ontology)
    }

    /// ENUMERATED and ORDERED fields with ontology scope, sorted by name.
    pub fn ontology_value_fields(&self) -> Vec<&FieldDefinition> {
        let mut matches = self.fields_of(&FieldType::Enumerated, FieldScope::Ontology);
        matches.extend(self.fields_of(&FieldType::Ordered, FieldScope::Ontology));
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
