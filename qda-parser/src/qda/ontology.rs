//! `ONTOLOGY` block extraction.
//!
//! Same state machine as the SOURCE/ITEM parser, with two differences: the
//! concept name is free text up to the end of the header line (not an
//! `@token`), and repeated field names accumulate into ordered lists. The
//! per-occurrence entry list is kept alongside the map because a repeated
//! field has several distinct source locations.

use std::collections::HashMap;
use std::ops::Range as ByteRange;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::qda::fields::{collect_fields, FieldEntry, FieldValue, RepeatPolicy};
use crate::qda::location::LineIndex;

static ONTOLOGY_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^ONTOLOGY\s+(.+)$").unwrap());
static ONTOLOGY_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^END\s+ONTOLOGY\s*$").unwrap());

/// One parsed ontology concept.
#[derive(Debug, Clone, PartialEq)]
pub struct OntologyBlock {
    /// The concept name, trimmed free text.
    pub name: String,
    /// The file the block came from.
    pub file: PathBuf,
    /// Field name to accumulated value(s).
    pub fields: HashMap<String, FieldValue>,
    /// Every field occurrence with its own location.
    pub entries: Vec<FieldEntry>,
    /// Zero-based line of the block header.
    pub start_line: usize,
    /// Byte span of the whole block.
    pub span: ByteRange<usize>,
    /// Byte span of the inner content.
    pub body_span: ByteRange<usize>,
}

impl OntologyBlock {
    /// The first (or only) value of a field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(FieldValue::first)
    }

    /// All values of a field in occurrence order.
    pub fn field_values(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
            .collect()
    }
}

struct OpenBlock {
    name: String,
    header_start: usize,
    body_start: usize,
}

/// Extract all well-formed ontology blocks, in document order.
pub fn parse_ontology_blocks(text: &str, file: &Path) -> Vec<OntologyBlock> {
    let index = LineIndex::new(text);
    let mut blocks = Vec::new();
    let mut state: Option<OpenBlock> = None;

    let mut offset = 0;
    for raw_line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim();

        if let Some(open) = &state {
            if ONTOLOGY_CLOSE.is_match(trimmed) {
                let body_span = open.body_start..line_start;
                let collected =
                    collect_fields(text, body_span.clone(), &index, RepeatPolicy::Accumulate);
                blocks.push(OntologyBlock {
                    name: open.name.clone(),
                    file: file.to_path_buf(),
                    fields: collected.map,
                    entries: collected.entries,
                    start_line: index.line_of(open.header_start),
                    span: open.header_start..line_start + line.len(),
                    body_span,
                });
                state = None;
                continue;
            }
        }
        if let Some(captures) = ONTOLOGY_OPEN.captures(trimmed) {
            state = Some(OpenBlock {
                name: captures[1].trim().to_string(),
                header_start: line_start,
                body_start: offset,
            });
        }
    }

    blocks
}
