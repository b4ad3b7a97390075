//! `SOURCE`/`ITEM` block extraction.
//!
//! Blocks are extracted by an explicit line-by-line state machine
//! (enter-block / collect / exit-block) rather than a document-spanning
//! regex, so the failure modes are explicit: an unterminated block is
//! dropped, and a new header while a block is open drops the open block
//! and starts the new one. Absence of structure is a normal outcome, not
//! an error.

use std::collections::HashMap;
use std::ops::Range as ByteRange;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::qda::fields::{collect_fields, FieldEntry, FieldValue, RepeatPolicy};
use crate::qda::location::LineIndex;

/// `SOURCE @key`, where the key is `@` plus a Unicode identifier.
static SOURCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^SOURCE\s+(@[\p{L}\p{N}._\-]+)\s*$").unwrap());
static SOURCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^END\s+SOURCE\s*$").unwrap());

static ITEM_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ITEM\s+(@[\p{L}\p{N}._\-]+)\s*$").unwrap());
static ITEM_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^END\s+ITEM\s*$").unwrap());

/// The two block kinds of the primary annotation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKeyword {
    Source,
    Item,
}

impl BlockKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKeyword::Source => "SOURCE",
            BlockKeyword::Item => "ITEM",
        }
    }

    fn patterns(&self) -> (&'static Regex, &'static Regex) {
        match self {
            BlockKeyword::Source => (&SOURCE_OPEN, &SOURCE_CLOSE),
            BlockKeyword::Item => (&ITEM_OPEN, &ITEM_CLOSE),
        }
    }
}

/// One parsed block. Recreated on every parse pass, never mutated after
/// construction. Duplicate keys produce independent blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The bibliographic reference token, including the leading `@`.
    pub key: String,
    /// Field name to value; first occurrence wins on repeats.
    pub fields: HashMap<String, FieldValue>,
    /// Every field occurrence with its own location.
    pub entries: Vec<FieldEntry>,
    /// Zero-based line of the block header.
    pub start_line: usize,
    /// Byte span of the whole block, header through terminator.
    pub span: ByteRange<usize>,
    /// Byte span of the inner content, needed to re-locate tokens later.
    pub body_span: ByteRange<usize>,
}

impl Block {
    /// The first (or only) value of a field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(FieldValue::first)
    }
}

struct OpenBlock {
    key: String,
    header_start: usize,
    body_start: usize,
}

/// Extract all well-formed blocks of one keyword, in document order.
pub fn parse_blocks(text: &str, keyword: BlockKeyword) -> Vec<Block> {
    let (open_re, close_re) = keyword.patterns();
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
            if close_re.is_match(trimmed) {
                let body_span = open.body_start..line_start;
                let collected = collect_fields(text, body_span.clone(), &index, RepeatPolicy::FirstWins);
                blocks.push(Block {
                    key: open.key.clone(),
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
        if let Some(captures) = open_re.captures(trimmed) {
            // A header while a block is open drops the unterminated block.
            state = Some(OpenBlock {
                key: captures[1].to_string(),
                header_start: line_start,
                body_start: offset,
            });
        }
    }
    // A block still open at end of input is unterminated: dropped.

    blocks
}

/// Aggregate ITEM counts per bibref, for callers that sum item usage
/// across duplicate blocks.
pub fn item_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for block in parse_blocks(text, BlockKeyword::Item) {
        *counts.entry(block.key).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "SOURCE @ref1\n    description: A\nEND SOURCE\n\nITEM @ref1\n    text: hi\nEND ITEM\nITEM @ref1\n    text: bye\nEND ITEM\n";

    #[test]
    fn extracts_source_and_item_blocks() {
        let sources = parse_blocks(SAMPLE, BlockKeyword::Source);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].key, "@ref1");
        assert_eq!(sources[0].field("description"), Some("A"));
        assert_eq!(sources[0].start_line, 0);

        let items = parse_blocks(SAMPLE, BlockKeyword::Item);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "@ref1");
        assert_eq!(items[1].key, "@ref1");
        assert_eq!(items[0].field("text"), Some("hi"));
        assert_eq!(items[1].field("text"), Some("bye"));
    }

    #[test]
    fn item_counts_sum_duplicate_keys() {
        let counts = item_counts(SAMPLE);
        assert_eq!(counts.get("@ref1"), Some(&2));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let text = "source @a\n    code: x\nend source\n";
        let blocks = parse_blocks(text, BlockKeyword::Source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].key, "@a");
    }

    #[test]
    fn unterminated_block_is_dropped() {
        let text = "SOURCE @a\n    code: x\n";
        assert!(parse_blocks(text, BlockKeyword::Source).is_empty());
    }

    #[test]
    fn header_inside_open_block_restarts() {
        let text = "SOURCE @a\n    code: x\nSOURCE @b\n    code: y\nEND SOURCE\n";
        let blocks = parse_blocks(text, BlockKeyword::Source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].key, "@b");
        assert_eq!(blocks[0].field("code"), Some("y"));
    }

    #[test]
    fn header_requires_an_at_key() {
        let text = "SOURCE ref1\n    code: x\nEND SOURCE\n";
        assert!(parse_blocks(text, BlockKeyword::Source).is_empty());
    }

    #[test]
    fn unicode_keys_are_accepted() {
        let text = "ITEM @crianção.2024_a\n    text: ok\nEND ITEM\n";
        let items = parse_blocks(text, BlockKeyword::Item);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "@crianção.2024_a");
    }

    #[test]
    fn start_line_round_trips_through_the_index() {
        let items = parse_blocks(SAMPLE, BlockKeyword::Item);
        let index = LineIndex::new(SAMPLE);
        for item in &items {
            assert_eq!(index.line_of(item.span.start), item.start_line);
        }
    }

    #[test]
    fn reparsing_yields_identical_blocks() {
        assert_eq!(
            parse_blocks(SAMPLE, BlockKeyword::Item),
            parse_blocks(SAMPLE, BlockKeyword::Item)
        );
    }
}
