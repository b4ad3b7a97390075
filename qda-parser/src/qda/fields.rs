//! The shared `field: value` line grammar.
//!
//! Block bodies, ontology bodies and project descriptors all use the same
//! line-oriented field grammar, so the extraction state machine lives here.
//!
//! A line matching `<name>:<rest>` commits the currently open field and
//! opens a new one. Any other non-blank, non-`#`-comment line joins the
//! open field's value as a continuation, which is how multi-line values
//! work with only the first line carrying the `name:` prefix. Blank and
//! comment lines are skipped without closing the field. The last open
//! field commits at end of input.
//!
//! Policy: a committed field always keeps its key, even when the trimmed
//! value is empty. Fields that legitimately hold empty values must survive
//! until later merge logic runs; consumers that want to skip them can.

use std::collections::HashMap;
use std::ops::Range as ByteRange;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::qda::location::LineIndex;

/// `name: value` lines; the field name is a Unicode identifier
/// (letters/digits/`.`/`_`/`-`), the rest of the line is the value head.
static FIELD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\p{L}\p{N}._\-]+):(.*)$").unwrap());

/// How repeated field names combine inside one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// The first committed value wins; later repeats only show up in the
    /// per-occurrence entry list. Used for SOURCE/ITEM blocks.
    FirstWins,
    /// Repeats accumulate into an ordered list: the second occurrence
    /// turns the value into a two-element list, further repeats append.
    /// Required by the ontology parser.
    Accumulate,
}

/// A field value: a single string, or an ordered list when the field name
/// recurred under [`RepeatPolicy::Accumulate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// The first (or only) value.
    pub fn first(&self) -> &str {
        match self {
            FieldValue::Single(value) => value,
            FieldValue::Many(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// All values in occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: Vec<&str> = match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Many(values) => values.iter().map(String::as_str).collect(),
        };
        values.into_iter()
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValue::Single(_) => 1,
            FieldValue::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn accumulate(&mut self, value: String) {
        match self {
            FieldValue::Single(existing) => {
                *self = FieldValue::Many(vec![std::mem::take(existing), value]);
            }
            FieldValue::Many(values) => values.push(value),
        }
    }
}

/// One concrete occurrence of a field, with its own location. A repeated
/// field has several entries with distinct lines, which the field map
/// alone cannot represent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: String,
    pub value: String,
    /// Zero-based line of the `name:` line, absolute within the file.
    pub line: usize,
    /// Column where the raw value begins on that line.
    pub column: usize,
    /// Absolute byte span of the raw value text, from just after the colon
    /// through the end of the last continuation line. Token occurrences
    /// are re-located by searching this span.
    pub value_span: ByteRange<usize>,
}

/// Extraction result: the field map plus the ordered occurrence entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldCollection {
    pub map: HashMap<String, FieldValue>,
    pub entries: Vec<FieldEntry>,
}

impl FieldCollection {
    /// The first (or only) value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(FieldValue::first)
    }

    /// All values of a field in occurrence order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
            .collect()
    }
}

struct OpenField {
    name: String,
    parts: Vec<String>,
    line: usize,
    column: usize,
    span_start: usize,
    span_end: usize,
}

/// Run the field state machine over `text[body]`. Line/column values in the
/// returned entries are absolute within `text`, resolved through `index`.
pub fn collect_fields(
    text: &str,
    body: ByteRange<usize>,
    index: &LineIndex,
    policy: RepeatPolicy,
) -> FieldCollection {
    let mut collection = FieldCollection::default();
    let mut open: Option<OpenField> = None;

    let body_text = &text[body.clone()];
    let mut offset = body.start;
    for raw_line in body_text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let after_indent = line.trim_start();
        let indent = line.len() - after_indent.len();
        if let Some(captures) = FIELD_LINE.captures(after_indent) {
            commit(&mut collection, open.take(), policy);
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value_column = indent + name.len() + 1;
            open = Some(OpenField {
                name: name.to_string(),
                parts: vec![captures
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()],
                line: index.line_of(line_start),
                column: value_column,
                span_start: line_start + value_column,
                span_end: line_start + line.len(),
            });
        } else if let Some(field) = open.as_mut() {
            field.parts.push(trimmed.to_string());
            field.span_end = line_start + line.len();
        }
        // A continuation line with no open field is a parse-miss: skipped.
    }
    commit(&mut collection, open.take(), policy);

    collection
}

fn commit(collection: &mut FieldCollection, open: Option<OpenField>, policy: RepeatPolicy) {
    let Some(field) = open else {
        return;
    };
    let value = field.parts.join("\n").trim().to_string();

    collection.entries.push(FieldEntry {
        name: field.name.clone(),
        value: value.clone(),
        line: field.line,
        column: field.column,
        value_span: field.span_start..field.span_end,
    });

    match policy {
        RepeatPolicy::FirstWins => {
            collection.map.entry(field.name).or_insert(FieldValue::Single(value));
        }
        RepeatPolicy::Accumulate => match collection.map.entry(field.name) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(FieldValue::Single(value));
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.get_mut().accumulate(value);
            }
        },
    }
}
