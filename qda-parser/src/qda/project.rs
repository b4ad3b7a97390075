//! Project descriptor loading.
//!
//! A descriptor is a plain field-line file (same grammar as block bodies)
//! naming the template and the typed include lists. Include fields repeat,
//! and a multi-line value contributes one path per line. Every path is
//! resolved relative to the descriptor's directory.
//!
//! ```text
//! name: alarm fatigue study
//! template: schema.qdt
//! annotations: interviews.qda
//! annotations: field-notes.qda
//! ontology: core.qdo
//! bibliography: refs.bib
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::qda::fields::{collect_fields, RepeatPolicy};
use crate::qda::location::LineIndex;

/// Error loading a descriptor file. Callers recover with a workspace scan
/// fallback; this is never fatal.
#[derive(Debug, Clone)]
pub enum LoaderError {
    Io(String),
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(err.to_string())
    }
}

/// Parsed project metadata with resolved include lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectDescriptor {
    /// The directory paths were resolved against.
    pub root: PathBuf,
    pub name: Option<String>,
    pub template: Option<PathBuf>,
    pub annotations: Vec<PathBuf>,
    pub ontologies: Vec<PathBuf>,
    pub bibliography: Option<PathBuf>,
}

/// Load and parse a descriptor file.
pub fn load_project(path: &Path) -> Result<ProjectDescriptor, LoaderError> {
    let text = fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(parse_project(&text, dir))
}

/// Parse descriptor text, resolving paths against `dir`.
pub fn parse_project(text: &str, dir: &Path) -> ProjectDescriptor {
    let index = LineIndex::new(text);
    let fields = collect_fields(text, 0..text.len(), &index, RepeatPolicy::Accumulate);

    let mut descriptor = ProjectDescriptor {
        root: dir.to_path_buf(),
        ..Default::default()
    };
    descriptor.name = fields.get("name").filter(|v| !v.is_empty()).map(String::from);
    descriptor.template = fields
        .get("template")
        .filter(|v| !v.is_empty())
        .map(|v| resolve(dir, v));
    descriptor.bibliography = fields
        .get("bibliography")
        .filter(|v| !v.is_empty())
        .map(|v| resolve(dir, v));
    descriptor.annotations = include_paths(&fields.get_all("annotations"), dir);
    descriptor.ontologies = include_paths(&fields.get_all("ontology"), dir);
    descriptor
}

fn include_paths(values: &[&str], dir: &Path) -> Vec<PathBuf> {
    values
        .iter()
        .flat_map(|value| value.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| resolve(dir, line))
        .collect()
}

fn resolve(dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name: alarm fatigue study\ntemplate: schema.qdt\nannotations: interviews.qda\nannotations: field-notes.qda\nontology: core.qdo\nbibliography: refs.bib\n";

    #[test]
    fn resolves_paths_against_the_descriptor_directory() {
        let descriptor = parse_project(SAMPLE, Path::new("/study"));
        assert_eq!(descriptor.name.as_deref(), Some("alarm fatigue study"));
        assert_eq!(descriptor.template, Some(PathBuf::from("/study/schema.qdt")));
        assert_eq!(
            descriptor.annotations,
            vec![
                PathBuf::from("/study/interviews.qda"),
                PathBuf::from("/study/field-notes.qda")
            ]
        );
        assert_eq!(descriptor.ontologies, vec![PathBuf::from("/study/core.qdo")]);
        assert_eq!(descriptor.bibliography, Some(PathBuf::from("/study/refs.bib")));
    }

    #[test]
    fn multi_line_include_values_contribute_one_path_per_line() {
        let text = "annotations: a.qda\n    b.qda\n    c.qda\n";
        let descriptor = parse_project(text, Path::new("/p"));
        assert_eq!(
            descriptor.annotations,
            vec![
                PathBuf::from("/p/a.qda"),
                PathBuf::from("/p/b.qda"),
                PathBuf::from("/p/c.qda")
            ]
        );
    }

    #[test]
    fn absolute_paths_pass_through() {
        let descriptor = parse_project("template: /opt/shared/schema.qdt\n", Path::new("/p"));
        assert_eq!(descriptor.template, Some(PathBuf::from("/opt/shared/schema.qdt")));
    }

    #[test]
    fn empty_descriptor_yields_defaults() {
        let descriptor = parse_project("# only a comment\n", Path::new("/p"));
        assert!(descriptor.name.is_none());
        assert!(descriptor.template.is_none());
        assert!(descriptor.annotations.is_empty());
    }

    #[test]
    fn missing_file_is_a_loader_error() {
        assert!(load_project(Path::new("/nonexistent/project.qdp")).is_err());
    }
}
