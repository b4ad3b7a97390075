//! Template (schema) parsing: `FIELD <name> TYPE <type> … END FIELD`.
//!
//! A FIELD block declares one typed field. TYPE is mandatory on the header
//! line; SCOPE, ARITY, RELATIONS and VALUES may appear anywhere in the
//! block, including on the header line itself (`FIELD topic TYPE
//! ENUMERATED SCOPE ONTOLOGY VALUES …`), which is why the directives are
//! matched over the block span instead of line by line. FIELD blocks do
//! not nest, so the span grammar is safe here.
//!
//! An unreadable file or zero matching blocks yields an empty result;
//! callers fall back to [`default_field_definitions`] rather than fail.

use once_cell::sync::Lazy;
use regex::Regex;

static FIELD_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bFIELD\s+([\p{L}\p{N}._\-]+)\s+TYPE\s+([A-Za-z]+)\b(.*?)\bEND\s+FIELD\b")
        .unwrap()
});
static SCOPE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSCOPE\s+([A-Za-z]+)").unwrap());
static ARITY_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bARITY\s*(>=|<=|>|<|=)\s*(\d+)").unwrap());
static RELATIONS_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bRELATIONS\b(.*?)\bEND\s+RELATIONS\b").unwrap());
static VALUES_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bVALUES\b(.*?)\bEND\s+VALUES\b").unwrap());
static RELATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\p{L}\p{N}._\-]+):").unwrap());
static VALUE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[(\d+)\]\s*)?([^:\[\]]+):\s*(.*)$").unwrap());

/// The semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Code,
    Chain,
    Quotation,
    Memo,
    Text,
    Topic,
    Ordered,
    Enumerated,
    /// Unrecognized type tokens round-trip instead of being dropped.
    Other(String),
}

impl FieldType {
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "CODE" => FieldType::Code,
            "CHAIN" => FieldType::Chain,
            "QUOTATION" => FieldType::Quotation,
            "MEMO" => FieldType::Memo,
            "TEXT" => FieldType::Text,
            "TOPIC" => FieldType::Topic,
            "ORDERED" => FieldType::Ordered,
            "ENUMERATED" => FieldType::Enumerated,
            other => FieldType::Other(other.to_string()),
        }
    }
}

/// Where a field may appear. Defaults to ITEM when no SCOPE is declared;
/// unknown scope tokens fall back to the same default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldScope {
    #[default]
    Item,
    Source,
    Ontology,
}

impl FieldScope {
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "SOURCE" => FieldScope::Source,
            "ONTOLOGY" => FieldScope::Ontology,
            _ => FieldScope::Item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArityOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

/// A structured arity constraint, e.g. `ARITY >=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    pub op: ArityOp,
    pub value: u32,
}

/// One declared enumerated value: `[index] label: description`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub index: Option<u32>,
    pub label: String,
    pub description: String,
}

/// A parsed field declaration. Type and scope are fixed for the lifetime
/// of a loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub scope: FieldScope,
    pub arity: Option<Arity>,
    /// Declared relation vocabulary, in declaration order. Only meaningful
    /// for CHAIN fields.
    pub relations: Vec<String>,
    /// Declared enumerated values, in declaration order.
    pub values: Vec<EnumValue>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType, scope: FieldScope) -> Self {
        Self {
            name: name.into(),
            field_type,
            scope,
            arity: None,
            relations: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Whether this field declares a controlled relation vocabulary.
    pub fn has_relations(&self) -> bool {
        self.field_type == FieldType::Chain && !self.relations.is_empty()
    }
}

/// Parse every FIELD declaration in a template file.
pub fn parse_template(text: &str) -> Vec<FieldDefinition> {
    FIELD_SPAN
        .captures_iter(text)
        .map(|captures| {
            let mut definition = FieldDefinition::new(
                captures[1].to_string(),
                FieldType::parse(&captures[2]),
                FieldScope::Item,
            );
            let mut rest = captures[3].to_string();

            if let Some(relations) = RELATIONS_SPAN.captures(&rest) {
                definition.relations = relation_tokens(&relations[1]);
                let span = relations.get(0).unwrap().range();
                rest.replace_range(span, " ");
            }
            if let Some(values) = VALUES_SPAN.captures(&rest) {
                definition.values = enum_values(&values[1]);
                let span = values.get(0).unwrap().range();
                rest.replace_range(span, " ");
            }
            // Directives are matched after the list blocks are cut out so
            // that a SCOPE or ARITY word inside a description cannot bind.
            if let Some(scope) = SCOPE_DIRECTIVE.captures(&rest) {
                definition.scope = FieldScope::parse(&scope[1]);
            }
            if let Some(arity) = ARITY_DIRECTIVE.captures(&rest) {
                definition.arity = parse_arity(&arity[1], &arity[2]);
            }
            definition
        })
        .collect()
}

fn relation_tokens(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| RELATION_LINE.captures(line))
        .map(|captures| captures[1].to_string())
        .collect()
}

fn enum_values(body: &str) -> Vec<EnumValue> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| VALUE_LINE.captures(line))
        .map(|captures| EnumValue {
            index: captures.get(1).and_then(|m| m.as_str().parse().ok()),
            label: captures[2].trim().to_string(),
            description: captures[3].trim().to_string(),
        })
        .collect()
}

fn parse_arity(op: &str, value: &str) -> Option<Arity> {
    let op = match op {
        ">=" => ArityOp::Ge,
        "<=" => ArityOp::Le,
        ">" => ArityOp::Gt,
        "<" => ArityOp::Lt,
        "=" => ArityOp::Eq,
        _ => return None,
    };
    value.parse().ok().map(|value| Arity { op, value })
}

/// The built-in field set used when no template is available.
pub fn default_field_definitions() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("description", FieldType::Text, FieldScope::Source),
        FieldDefinition::new("text", FieldType::Quotation, FieldScope::Item),
        FieldDefinition::new("code", FieldType::Code, FieldScope::Item),
        FieldDefinition::new("memo", FieldType::Memo, FieldScope::Item),
        FieldDefinition::new("chain", FieldType::Chain, FieldScope::Item),
        FieldDefinition::new("topic", FieldType::Topic, FieldScope::Ontology),
    ]
}
