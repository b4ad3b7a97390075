//! Bibliography lookup.
//!
//! A minimal BibTeX reader: enough to resolve an `@key` to its title,
//! author, year and abstract for hover and listing surfaces. Entries that
//! fail to parse are skipped, never fatal; a corpus with a broken
//! bibliography still works, just with bare keys.

use std::collections::HashMap;

/// One parsed bibliography entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BibRecord {
    pub key: String,
    pub entry_type: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub abstract_text: Option<String>,
}

/// Case-insensitive key lookup over parsed records.
#[derive(Debug, Clone, Default)]
pub struct BibIndex {
    records: HashMap<String, BibRecord>,
}

impl BibIndex {
    pub fn parse(text: &str) -> Self {
        let mut records = HashMap::new();
        for record in scan_entries(text) {
            records.insert(record.key.to_lowercase(), record);
        }
        Self { records }
    }

    /// Look up by key, with or without the leading `@`.
    pub fn get(&self, bibref: &str) -> Option<&BibRecord> {
        let key = bibref.strip_prefix('@').unwrap_or(bibref);
        self.records.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn scan_entries(text: &str) -> Vec<BibRecord> {
    let mut records = Vec::new();
    let mut rest = text;
    while let Some(at) = rest.find('@') {
        rest = &rest[at + 1..];
        let Some(open) = rest.find('{') else { break };
        let entry_type = rest[..open].trim().to_lowercase();
        // @comment and @preamble carry no key/field payload we care about.
        if entry_type.is_empty() || entry_type == "comment" || entry_type == "preamble" {
            continue;
        }
        let Some(body_len) = balanced_span(&rest[open..]) else {
            break;
        };
        let body = &rest[open + 1..open + body_len - 1];
        rest = &rest[open + body_len..];
        if let Some(record) = parse_entry(&entry_type, body) {
            records.push(record);
        }
    }
    records
}

/// Length of the brace-balanced span starting at an opening `{`, the
/// braces themselves included. `None` when the text ends unbalanced.
fn balanced_span(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_entry(entry_type: &str, body: &str) -> Option<BibRecord> {
    let (key, fields_text) = match body.find(',') {
        Some(comma) => (body[..comma].trim(), &body[comma + 1..]),
        None => (body.trim(), ""),
    };
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return None;
    }

    let mut record = BibRecord {
        key: key.to_string(),
        entry_type: entry_type.to_string(),
        ..BibRecord::default()
    };
    for (name, value) in scan_fields(fields_text) {
        match name.as_str() {
            "title" => record.title = Some(value),
            "author" => record.author = Some(value),
            "year" => record.year = Some(value),
            "abstract" => record.abstract_text = Some(value),
            _ => {}
        }
    }
    Some(record)
}

fn scan_fields(text: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut rest = text;
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq]
            .rsplit(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        rest = rest[eq + 1..].trim_start();
        let (value, consumed) = read_value(rest);
        if !name.is_empty() {
            fields.push((name, value));
        }
        rest = &rest[consumed..];
    }
    fields
}

/// Read one field value: brace-delimited, quote-delimited, or bare up to
/// the next comma. Returns the cleaned value and bytes consumed.
fn read_value(text: &str) -> (String, usize) {
    if text.starts_with('{') {
        if let Some(len) = balanced_span(text) {
            let inner = &text[1..len - 1];
            return (clean_value(inner), len);
        }
        return (clean_value(&text[1..]), text.len());
    }
    if let Some(stripped) = text.strip_prefix('"') {
        if let Some(close) = stripped.find('"') {
            return (clean_value(&stripped[..close]), close + 2);
        }
        return (clean_value(stripped), text.len());
    }
    let end = text.find(',').unwrap_or(text.len());
    (clean_value(&text[..end]), end)
}

/// Collapse internal whitespace runs and drop grouping braces.
fn clean_value(raw: &str) -> String {
    let no_braces: String = raw.chars().filter(|ch| *ch != '{' && *ch != '}').collect();
    no_braces.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIB: &str = r#"
@article{ref1,
    title = {Alarm {Fatigue} in Intensive Care},
    author = {Silva, Ana and Costa, Jo{\~a}o},
    year = {2019},
    abstract = {Long running observational
                study of alarm response.},
}

@book{Ref2,
    title = "Qualitative Methods",
    year = 2003
}
"#;

    #[test]
    fn parses_records_with_braced_and_quoted_values() {
        let index = BibIndex::parse(BIB);
        assert_eq!(index.len(), 2);

        let first = index.get("@ref1").unwrap();
        assert_eq!(first.entry_type, "article");
        assert_eq!(first.title.as_deref(), Some("Alarm Fatigue in Intensive Care"));
        assert_eq!(first.year.as_deref(), Some("2019"));
        assert_eq!(
            first.abstract_text.as_deref(),
            Some("Long running observational study of alarm response.")
        );

        let second = index.get("ref2").unwrap();
        assert_eq!(second.title.as_deref(), Some("Qualitative Methods"));
        assert_eq!(second.year.as_deref(), Some("2003"));
    }

    #[test]
    fn lookup_is_case_insensitive_and_at_optional() {
        let index = BibIndex::parse(BIB);
        assert!(index.get("@REF1").is_some());
        assert!(index.get("ref1").is_some());
        assert!(index.get("@missing").is_none());
    }

    #[test]
    fn comment_and_preamble_entries_are_skipped() {
        let text = "@comment{ignore me}\n@preamble{\"x\"}\n@misc{k, year = 1999}";
        let index = BibIndex::parse(text);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("k").unwrap().year.as_deref(), Some("1999"));
    }

    #[test]
    fn malformed_entries_do_not_poison_the_rest() {
        let text = "@article{bad key with spaces, title={x}}\n@misc{good, year=2020}";
        let index = BibIndex::parse(text);
        assert_eq!(index.len(), 1);
        assert!(index.get("good").is_some());
    }

    #[test]
    fn unbalanced_tail_is_dropped_quietly() {
        let text = "@misc{ok, year=2020}\n@article{broken, title={never closed";
        let index = BibIndex::parse(text);
        assert_eq!(index.len(), 1);
    }
}
