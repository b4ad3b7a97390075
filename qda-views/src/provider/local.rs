//! Workspace-backed provider.
//!
//! Computes the same six shapes as the server path, straight from the
//! corpus text files. Used when no server is available; the contract is
//! identical, including total operations and zero-based positions.
//!
//! File selection: a `project.qdp` descriptor next to the workspace root
//! pins explicit include lists; without one the corpus is every matching
//! file under the root. The parsed template registry is cached per
//! template path until `invalidate` is called.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use qda_analysis::graph::{build_graph_with, Direction, RelationEdge};
use qda_analysis::occurrences::{split_codes, token_occurrences};
use qda_analysis::registry::FieldRegistry;
use qda_analysis::workspace::{discover_files, display_path};
use qda_parser::qda::{
    load_project, parse_blocks, parse_chain_with, parse_ontology_blocks, Block, BlockKeyword,
    ChainKind, LineIndex, OntologyBlock, ProjectDescriptor,
};

use crate::provider::DataProvider;
use crate::shapes::{
    Code, CodeOccurrence, OntologyAnnotation, OntologyOccurrence, Reference, ReferenceOccurrence,
    RelationGraph, RelationGroup, RelationTriplet, TopicNode,
};

/// Descriptor filename looked for at the workspace root.
pub const PROJECT_DESCRIPTOR: &str = "project.qdp";
/// Template filename fallback when the descriptor declares none.
pub const DEFAULT_TEMPLATE: &str = "template.qdt";

pub struct LocalProvider {
    workspace_root: PathBuf,
    annotation_extensions: Vec<String>,
    ontology_extensions: Vec<String>,
    direction: Direction,
    template_cache: HashMap<PathBuf, FieldRegistry>,
}

/// One loaded annotation file with its parsed blocks.
struct AnnotationFile {
    shown: String,
    text: String,
    index: LineIndex,
    sources: Vec<Block>,
    items: Vec<Block>,
}

impl LocalProvider {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            annotation_extensions: vec!["qda".to_string()],
            ontology_extensions: vec!["qdo".to_string()],
            direction: Direction::TopDown,
            template_cache: HashMap::new(),
        }
    }

    pub fn with_extensions(mut self, annotations: Vec<String>, ontologies: Vec<String>) -> Self {
        self.annotation_extensions = annotations;
        self.ontology_extensions = ontologies;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Drop cached template state; called after a template file save.
    pub fn invalidate(&mut self) {
        self.template_cache.clear();
    }

    fn descriptor(&self) -> Option<ProjectDescriptor> {
        load_project(&self.workspace_root.join(PROJECT_DESCRIPTOR)).ok()
    }

    fn registry(&mut self, descriptor: Option<&ProjectDescriptor>) -> FieldRegistry {
        let path = descriptor
            .and_then(|d| d.template.clone())
            .unwrap_or_else(|| self.workspace_root.join(DEFAULT_TEMPLATE));
        if let Some(cached) = self.template_cache.get(&path) {
            return cached.clone();
        }
        let registry = match fs::read_to_string(&path) {
            Ok(text) => FieldRegistry::from_template_text(&text),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no readable template, using built-in fields");
                FieldRegistry::new(Vec::new())
            }
        };
        self.template_cache.insert(path, registry.clone());
        registry
    }

    fn annotation_paths(&self, descriptor: Option<&ProjectDescriptor>) -> Vec<PathBuf> {
        match descriptor {
            Some(d) if !d.annotations.is_empty() => d.annotations.clone(),
            _ => discover_files(&self.workspace_root, &self.annotation_extensions),
        }
    }

    fn ontology_paths(&self, descriptor: Option<&ProjectDescriptor>) -> Vec<PathBuf> {
        match descriptor {
            Some(d) if !d.ontologies.is_empty() => d.ontologies.clone(),
            _ => discover_files(&self.workspace_root, &self.ontology_extensions),
        }
    }

    fn load_annotations(&self, descriptor: Option<&ProjectDescriptor>) -> Vec<AnnotationFile> {
        let mut loaded = Vec::new();
        for path in self.annotation_paths(descriptor) {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable annotation file");
                    continue;
                }
            };
            let index = LineIndex::new(&text);
            let sources = parse_blocks(&text, BlockKeyword::Source);
            let items = parse_blocks(&text, BlockKeyword::Item);
            loaded.push(AnnotationFile {
                shown: display_path(&self.workspace_root, &path).display().to_string(),
                text,
                index,
                sources,
                items,
            });
        }
        loaded
    }

    fn load_ontologies(&self, descriptor: Option<&ProjectDescriptor>) -> Vec<OntologyBlock> {
        let mut blocks = Vec::new();
        for path in self.ontology_paths(descriptor) {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable ontology file");
                    continue;
                }
            };
            let shown = display_path(&self.workspace_root, &path);
            blocks.extend(parse_ontology_blocks(&text, &shown));
        }
        blocks
    }

    fn shown_path(&self, path: &Path) -> String {
        display_path(&self.workspace_root, path).display().to_string()
    }
}

fn kind_label(kind: ChainKind) -> &'static str {
    match kind {
        ChainKind::Simple => "simple",
        ChainKind::Qualified => "qualified",
    }
}

#[async_trait]
impl DataProvider for LocalProvider {
    async fn references(&mut self) -> Vec<Reference> {
        let descriptor = self.descriptor();
        let files = self.load_annotations(descriptor.as_ref());

        let mut total_items: HashMap<String, usize> = HashMap::new();
        for file in &files {
            for item in &file.items {
                *total_items.entry(item.key.clone()).or_insert(0) += 1;
            }
        }

        let mut grouped: Vec<Reference> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in &files {
            let mut file_items: HashMap<&str, usize> = HashMap::new();
            for item in &file.items {
                *file_items.entry(item.key.as_str()).or_insert(0) += 1;
            }
            for source in &file.sources {
                let occurrence = ReferenceOccurrence {
                    file: file.shown.clone(),
                    line: source.start_line,
                    item_count: file_items.get(source.key.as_str()).copied().unwrap_or(0),
                };
                match index.get(&source.key) {
                    Some(&at) => grouped[at].occurrences.push(occurrence),
                    None => {
                        index.insert(source.key.clone(), grouped.len());
                        grouped.push(Reference {
                            bibref: source.key.clone(),
                            item_count: total_items.get(&source.key).copied().unwrap_or(0),
                            occurrences: vec![occurrence],
                        });
                    }
                }
            }
        }

        // Items whose bibref never appears as a SOURCE block still count
        // as references, just without a source location.
        for file in &files {
            for item in &file.items {
                if !index.contains_key(&item.key) {
                    index.insert(item.key.clone(), grouped.len());
                    grouped.push(Reference {
                        bibref: item.key.clone(),
                        item_count: total_items.get(&item.key).copied().unwrap_or(0),
                        occurrences: Vec::new(),
                    });
                }
            }
        }
        grouped
    }

    async fn codes(&mut self) -> Vec<Code> {
        let descriptor = self.descriptor();
        let registry = self.registry(descriptor.as_ref());
        let files = self.load_annotations(descriptor.as_ref());
        let defined: HashSet<String> = self
            .load_ontologies(descriptor.as_ref())
            .into_iter()
            .map(|block| block.name)
            .collect();

        let mut grouped: Vec<Code> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in &files {
            let shown = Path::new(&file.shown);
            for item in &file.items {
                for entry in &item.entries {
                    if !registry.is_code_field(&entry.name) {
                        continue;
                    }
                    for token in split_codes(&entry.value) {
                        for found in token_occurrences(&file.text, &file.index, shown, entry, token)
                        {
                            let occurrence = CodeOccurrence {
                                file: found.file.display().to_string(),
                                line: found.line,
                                column: found.column,
                                context: found.context,
                                field: found.field,
                            };
                            match index.get(token) {
                                Some(&at) => {
                                    grouped[at].usage_count += 1;
                                    grouped[at].occurrences.push(occurrence);
                                }
                                None => {
                                    index.insert(token.to_string(), grouped.len());
                                    grouped.push(Code {
                                        code: token.to_string(),
                                        usage_count: 1,
                                        ontology_defined: defined.contains(token),
                                        occurrences: vec![occurrence],
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        grouped
    }

    async fn relations(&mut self) -> Vec<RelationGroup> {
        let descriptor = self.descriptor();
        let registry = self.registry(descriptor.as_ref());
        let files = self.load_annotations(descriptor.as_ref());

        let mut grouped: Vec<RelationGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in &files {
            let shown = Path::new(&file.shown);
            for item in &file.items {
                for entry in &item.entries {
                    if !registry.is_chain_field(&entry.name) {
                        continue;
                    }
                    let vocabulary = registry
                        .field(&entry.name)
                        .map(|def| def.relations.clone())
                        .unwrap_or_default();
                    let parsed = parse_chain_with(&entry.value, &vocabulary);
                    let kind = kind_label(parsed.kind).to_string();
                    for (from, relation, to) in parsed.triplets() {
                        let anchor = token_occurrences(&file.text, &file.index, shown, entry, from)
                            .into_iter()
                            .next();
                        let (line, column) = anchor
                            .map(|found| (found.line, found.column))
                            .unwrap_or((entry.line, entry.column));
                        let triplet = RelationTriplet {
                            from: from.to_string(),
                            to: to.to_string(),
                            file: file.shown.clone(),
                            line,
                            column,
                            kind: kind.clone(),
                        };
                        match index.get(relation) {
                            Some(&at) => grouped[at].triplets.push(triplet),
                            None => {
                                index.insert(relation.to_string(), grouped.len());
                                grouped.push(RelationGroup {
                                    relation: relation.to_string(),
                                    triplets: vec![triplet],
                                });
                            }
                        }
                    }
                }
            }
        }
        grouped
    }

    async fn relation_graph(&mut self, bibref: Option<&str>) -> Option<RelationGraph> {
        let descriptor = self.descriptor();
        let registry = self.registry(descriptor.as_ref());
        let files = self.load_annotations(descriptor.as_ref());

        let mut edges: Vec<RelationEdge> = Vec::new();
        for file in &files {
            for item in &file.items {
                if bibref.is_some_and(|wanted| wanted != item.key) {
                    continue;
                }
                for entry in &item.entries {
                    if !registry.is_chain_field(&entry.name) {
                        continue;
                    }
                    let vocabulary = registry
                        .field(&entry.name)
                        .map(|def| def.relations.clone())
                        .unwrap_or_default();
                    let parsed = parse_chain_with(&entry.value, &vocabulary);
                    for (from, relation, to) in parsed.triplets() {
                        edges.push(RelationEdge::new(from, to, relation));
                    }
                }
            }
        }
        build_graph_with(bibref.unwrap_or("workspace"), &edges, self.direction)
            .map(|diagram_source| RelationGraph { diagram_source })
    }

    async fn ontology_topics(&mut self) -> Vec<TopicNode> {
        let descriptor = self.descriptor();
        let registry = self.registry(descriptor.as_ref());
        let blocks = self.load_ontologies(descriptor.as_ref());

        let topic_fields: Vec<String> = registry
            .ontology_topic_fields()
            .iter()
            .map(|def| def.name.clone())
            .collect();
        // Declared topic values come first, in declaration order;
        // undeclared labels follow in first-appearance order.
        let mut order: Vec<String> = registry
            .ontology_topic_fields()
            .iter()
            .flat_map(|def| def.values.iter().map(|value| value.label.clone()))
            .collect();
        let mut children: HashMap<String, Vec<TopicNode>> = HashMap::new();
        let mut untopiced: Vec<TopicNode> = Vec::new();

        for block in &blocks {
            let shown = block.file.display().to_string();
            let topic = topic_fields
                .iter()
                .find_map(|name| block.field(name))
                .map(str::trim)
                .filter(|label| !label.is_empty());
            match topic {
                Some(label) => {
                    if !order.iter().any(|known| known == label) {
                        order.push(label.to_string());
                    }
                    children.entry(label.to_string()).or_default().push(
                        TopicNode::leaf(block.name.clone(), 1, shown, block.start_line),
                    );
                }
                None => {
                    untopiced.push(TopicNode::leaf(block.name.clone(), 0, shown, block.start_line));
                }
            }
        }

        let mut roots: Vec<TopicNode> = Vec::new();
        for label in order {
            let Some(concepts) = children.remove(&label) else {
                continue;
            };
            let (file, line) = concepts
                .first()
                .map(|first| (first.file.clone(), first.line))
                .unwrap_or_default();
            roots.push(TopicNode {
                name: label,
                level: 0,
                file,
                line,
                children: concepts,
            });
        }
        roots.extend(untopiced);
        roots
    }

    async fn ontology_annotations(&mut self, active_file: Option<&Path>) -> Vec<OntologyAnnotation> {
        let descriptor = self.descriptor();
        let registry = self.registry(descriptor.as_ref());
        let files = self.load_annotations(descriptor.as_ref());
        let blocks = self.load_ontologies(descriptor.as_ref());

        let mut defined_at: HashMap<String, (String, usize)> = HashMap::new();
        for block in &blocks {
            defined_at
                .entry(block.name.clone())
                .or_insert_with(|| (block.file.display().to_string(), block.start_line));
        }

        let active_shown = active_file.map(|path| self.shown_path(path));

        let mut grouped: Vec<OntologyAnnotation> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for file in &files {
            if active_shown.as_deref().is_some_and(|wanted| wanted != file.shown) {
                continue;
            }
            let shown = Path::new(&file.shown);
            for item in &file.items {
                for entry in &item.entries {
                    if !registry.is_code_field(&entry.name) {
                        continue;
                    }
                    for token in split_codes(&entry.value) {
                        for found in token_occurrences(&file.text, &file.index, shown, entry, token)
                        {
                            let occurrence = OntologyOccurrence {
                                file: found.file.display().to_string(),
                                line: found.line,
                                column: found.column,
                                context: found.context,
                                field: found.field,
                                item_name: item.key.clone(),
                            };
                            match index.get(token) {
                                Some(&at) => grouped[at].occurrences.push(occurrence),
                                None => {
                                    let location = defined_at.get(token);
                                    index.insert(token.to_string(), grouped.len());
                                    grouped.push(OntologyAnnotation {
                                        code: token.to_string(),
                                        ontology_defined: location.is_some(),
                                        ontology_file: location.map(|(file, _)| file.clone()),
                                        ontology_line: location.map(|(_, line)| *line),
                                        occurrences: vec![occurrence],
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        // Concepts defined in the ontology but never applied still show
        // up, with no occurrences.
        for block in &blocks {
            if !index.contains_key(&block.name) {
                index.insert(block.name.clone(), grouped.len());
                grouped.push(OntologyAnnotation {
                    code: block.name.clone(),
                    ontology_defined: true,
                    ontology_file: Some(block.file.display().to_string()),
                    ontology_line: Some(block.start_line),
                    occurrences: Vec::new(),
                });
            }
        }
        grouped
    }
}
