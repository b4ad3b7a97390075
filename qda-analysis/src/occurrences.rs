//! Token back-resolution.
//!
//! Occurrences are always derived, never the system of record: every
//! lookup re-scans the raw text and re-locates the token inside the
//! recorded value span of a field entry. Positions are zero-based.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use qda_parser::qda::{FieldEntry, LineIndex};

/// One concrete, navigable appearance of a token in a text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// The trimmed text of the line containing the token.
    pub context: String,
    /// Name of the field whose value held the token.
    pub field: String,
}

/// Split a code-field value into individual code tokens. Values may list
/// several codes separated by commas or semicolons; a token repeated
/// within one value is yielded once, in first-appearance order, so the
/// occurrence search runs once per distinct token.
pub fn split_codes(value: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    value
        .split(|ch| ch == ',' || ch == ';')
        .map(str::trim)
        .filter(|token| !token.is_empty() && seen.insert(*token))
        .collect()
}

/// Locate every appearance of `token` inside one field entry's raw value
/// span. Matches are token-bounded: a hit whose neighbor is alphanumeric
/// (e.g. `cat` inside `category`) is skipped.
pub fn token_occurrences(
    text: &str,
    index: &LineIndex,
    file: &Path,
    entry: &FieldEntry,
    token: &str,
) -> Vec<Occurrence> {
    let mut found = Vec::new();
    if token.is_empty() {
        return found;
    }
    let span = entry.value_span.clone();
    let value = match text.get(span.clone()) {
        Some(value) => value,
        None => return found,
    };

    let mut search_from = 0;
    while let Some(rel) = value[search_from..].find(token) {
        let start = search_from + rel;
        search_from = start + token.len().max(1);
        if !token_bounded(value, start, token.len()) {
            continue;
        }
        let position = index.position_at(span.start + start);
        found.push(Occurrence {
            file: file.to_path_buf(),
            line: position.line,
            column: position.column,
            context: context_line(text, index, position.line),
            field: entry.name.clone(),
        });
    }
    found
}

/// First appearance only, for callers that need a single anchor.
pub fn locate_token(
    text: &str,
    index: &LineIndex,
    file: &Path,
    entry: &FieldEntry,
    token: &str,
) -> Option<Occurrence> {
    token_occurrences(text, index, file, entry, token)
        .into_iter()
        .next()
}

/// The trimmed text of one line, for display next to an occurrence.
pub fn context_line(text: &str, index: &LineIndex, line: usize) -> String {
    let start = index.line_start(line).unwrap_or(text.len());
    let rest = &text[start.min(text.len())..];
    let end = rest.find('\n').unwrap_or(rest.len());
    rest[..end].trim().to_string()
}

fn token_bounded(value: &str, start: usize, len: usize) -> bool {
    let before_ok = value[..start]
        .chars()
        .next_back()
        .is_none_or(|ch| !ch.is_alphanumeric());
    let after_ok = value[start + len..]
        .chars()
        .next()
        .is_none_or(|ch| !ch.is_alphanumeric());
    before_ok && after_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use qda_parser::qda::{parse_blocks, BlockKeyword};

    const TEXT: &str = "\
ITEM @q1
    code: alert fatigue, missed alarms
    chain: alert fatigue -> enables -> missed alarms
END ITEM
";

    fn entry_named<'a>(entries: &'a [FieldEntry], name: &str) -> &'a FieldEntry {
        entries
            .iter()
            .find(|entry| entry.name == name)
            .expect("entry present")
    }

    #[test]
    fn splits_on_commas_and_semicolons() {
        assert_eq!(
            split_codes("alert fatigue, missed alarms; workarounds"),
            vec!["alert fatigue", "missed alarms", "workarounds"]
        );
        assert_eq!(split_codes(" , ; "), Vec::<&str>::new());
        assert_eq!(split_codes("single"), vec!["single"]);
    }

    #[test]
    fn repeated_tokens_in_one_value_collapse() {
        assert_eq!(
            split_codes("alert fatigue, alert fatigue; drift"),
            vec!["alert fatigue", "drift"]
        );
    }

    #[test]
    fn locates_a_code_inside_its_value_span() {
        let index = LineIndex::new(TEXT);
        let blocks = parse_blocks(TEXT, BlockKeyword::Item);
        let entry = entry_named(&blocks[0].entries, "code");

        let hit = locate_token(TEXT, &index, Path::new("a.qda"), entry, "missed alarms")
            .expect("token located");
        assert_eq!(hit.line, 1);
        assert_eq!(hit.column, TEXT.lines().nth(1).unwrap().find("missed").unwrap());
        assert_eq!(hit.context, "code: alert fatigue, missed alarms");
        assert_eq!(hit.field, "code");
        assert_eq!(hit.file, PathBuf::from("a.qda"));
    }

    #[test]
    fn finds_every_appearance_in_a_chain_value() {
        let index = LineIndex::new(TEXT);
        let blocks = parse_blocks(TEXT, BlockKeyword::Item);
        let entry = entry_named(&blocks[0].entries, "chain");

        let hits = token_occurrences(TEXT, &index, Path::new("a.qda"), entry, "alert fatigue");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 2);
    }

    #[test]
    fn partial_word_hits_are_rejected() {
        let text = "ITEM @q\n    code: categories\nEND ITEM\n";
        let index = LineIndex::new(text);
        let blocks = parse_blocks(text, BlockKeyword::Item);
        let entry = entry_named(&blocks[0].entries, "code");

        assert!(locate_token(text, &index, Path::new("a.qda"), entry, "cat").is_none());
        assert!(locate_token(text, &index, Path::new("a.qda"), entry, "categories").is_some());
    }

    #[test]
    fn empty_token_yields_nothing() {
        let index = LineIndex::new(TEXT);
        let blocks = parse_blocks(TEXT, BlockKeyword::Item);
        let entry = entry_named(&blocks[0].entries, "code");
        assert!(token_occurrences(TEXT, &index, Path::new("a.qda"), entry, "").is_empty());
    }

    #[test]
    fn context_is_the_trimmed_containing_line() {
        let index = LineIndex::new(TEXT);
        assert_eq!(context_line(TEXT, &index, 0), "ITEM @q1");
        assert_eq!(
            context_line(TEXT, &index, 2),
            "chain: alert fatigue -> enables -> missed alarms"
        );
    }
}
