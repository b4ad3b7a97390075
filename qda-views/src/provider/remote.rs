//! Server-backed provider.
//!
//! One outstanding request per call, no retries beyond the transparent
//! legacy-alias fallback. Per-method circuit breaker: a method the
//! server does not know (under either name) is never asked for again in
//! this session. All other failures degrade to the canonical empty value
//! with a warning deduplicated per (method, reason).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use qda_analysis::graph::{build_graph, RelationEdge};
use qda_analysis::workspace::display_path;

use crate::protocol::{
    self, decode_entries, decode_envelope, Method, RawAnnotation, RawCode, RawRelation,
    RawReference, RawTopic, RequestParams, ServerTransport, TransportError,
};
use crate::provider::DataProvider;
use crate::shapes::{
    Code, CodeOccurrence, OntologyAnnotation, OntologyOccurrence, Reference, ReferenceOccurrence,
    RelationGraph, RelationGroup, RelationTriplet, TopicNode,
};

/// How many consecutive empty-but-successful responses imply a
/// server/client version mismatch.
const EMPTY_STREAK_LIMIT: u32 = 3;

pub struct RemoteProvider<T> {
    transport: T,
    workspace_root: PathBuf,
    /// Methods the server rejected with method-not-found, under both the
    /// primary name and the legacy alias.
    unsupported: HashSet<&'static str>,
    /// (method, reason) pairs already surfaced to the log.
    warned: HashSet<(String, String)>,
    empty_streak: u32,
    degraded: bool,
    degraded_pending: bool,
}

impl<T: ServerTransport> RemoteProvider<T> {
    pub fn new(transport: T, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            workspace_root: workspace_root.into(),
            unsupported: HashSet::new(),
            warned: HashSet::new(),
            empty_streak: 0,
            degraded: false,
            degraded_pending: false,
        }
    }

    /// True exactly once after three consecutive empty successful
    /// responses, across any mix of methods. Callers use it to prompt a
    /// version-mismatch warning; normal operation continues either way.
    pub fn take_degraded_signal(&mut self) -> bool {
        std::mem::take(&mut self.degraded_pending)
    }

    fn params(&self, bibref: Option<&str>, active_file: Option<&Path>) -> RequestParams {
        RequestParams {
            workspace_root: self.workspace_root.display().to_string(),
            bibref: bibref.map(str::to_string),
            active_file: active_file.map(|path| path.display().to_string()),
        }
    }

    async fn fetch(&mut self, method: &Method, params: RequestParams) -> Option<Vec<Value>> {
        if self.unsupported.contains(method.name) {
            return None;
        }

        let mut outcome = self.transport.request(method.name, &params).await;
        if matches!(outcome, Err(TransportError::MethodNotFound)) {
            tracing::debug!(method = method.name, alias = method.legacy, "retrying legacy alias");
            outcome = self.transport.request(method.legacy, &params).await;
        }

        match outcome {
            Ok(response) => match decode_envelope(&response, method.payload_key) {
                Ok(entries) => {
                    self.note_payload(entries.len());
                    Some(entries)
                }
                Err(err) => {
                    self.warn_once(method.name, err.to_string());
                    None
                }
            },
            Err(TransportError::MethodNotFound) => {
                self.unsupported.insert(method.name);
                self.warn_once(method.name, "not supported by this server".to_string());
                None
            }
            Err(TransportError::NotReady) => {
                // Expected while the server starts up; the caller
                // re-invokes after a ready event.
                tracing::debug!(method = method.name, "server not ready");
                None
            }
            Err(TransportError::Failed(reason)) => {
                self.warn_once(method.name, reason);
                None
            }
        }
    }

    fn decode<R>(&mut self, method: &Method, entries: Vec<Value>) -> Option<Vec<R>>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        match decode_entries(entries) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                self.warn_once(method.name, err.to_string());
                None
            }
        }
    }

    fn warn_once(&mut self, method: &'static str, reason: String) {
        if self.warned.insert((method.to_string(), reason.clone())) {
            tracing::warn!(method, %reason, "server query degraded to empty result");
        }
    }

    fn note_payload(&mut self, len: usize) {
        if len > 0 {
            self.empty_streak = 0;
            return;
        }
        self.empty_streak += 1;
        if self.empty_streak == EMPTY_STREAK_LIMIT && !self.degraded {
            self.degraded = true;
            self.degraded_pending = true;
            tracing::warn!(
                streak = self.empty_streak,
                "server keeps answering with empty payloads, possible version mismatch"
            );
        }
    }

    /// Decode file-URI forms, resolve relative forms against the
    /// workspace root, then render workspace-relative where possible.
    fn resolve_file(&self, raw: &str) -> String {
        let mut path = PathBuf::from(raw);
        if let Ok(uri) = url::Url::parse(raw) {
            if uri.scheme() == "file" {
                if let Ok(decoded) = uri.to_file_path() {
                    path = decoded;
                }
            }
        }
        let absolute = if path.is_absolute() {
            path
        } else {
            self.workspace_root.join(path)
        };
        display_path(&self.workspace_root, &absolute)
            .display()
            .to_string()
    }
}

/// One-based wire value to zero-based, clamped at zero.
fn zero_based(value: u32) -> usize {
    value.saturating_sub(1) as usize
}

#[async_trait]
impl<T: ServerTransport> DataProvider for RemoteProvider<T> {
    async fn references(&mut self) -> Vec<Reference> {
        let params = self.params(None, None);
        let Some(entries) = self.fetch(&protocol::REFERENCES, params).await else {
            return Vec::new();
        };
        let Some(raw) = self.decode::<RawReference>(&protocol::REFERENCES, entries) else {
            return Vec::new();
        };

        let mut grouped: Vec<Reference> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for entry in raw {
            let occurrence = ReferenceOccurrence {
                file: self.resolve_file(&entry.file),
                line: zero_based(entry.line),
                item_count: entry.item_count as usize,
            };
            match index.get(&entry.bibref) {
                Some(&at) => {
                    grouped[at].item_count += occurrence.item_count;
                    grouped[at].occurrences.push(occurrence);
                }
                None => {
                    index.insert(entry.bibref.clone(), grouped.len());
                    grouped.push(Reference {
                        bibref: entry.bibref,
                        item_count: occurrence.item_count,
                        occurrences: vec![occurrence],
                    });
                }
            }
        }
        grouped
    }

    async fn codes(&mut self) -> Vec<Code> {
        let params = self.params(None, None);
        let Some(entries) = self.fetch(&protocol::CODES, params).await else {
            return Vec::new();
        };
        let Some(raw) = self.decode::<RawCode>(&protocol::CODES, entries) else {
            return Vec::new();
        };

        let mut grouped: Vec<Code> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for entry in raw {
            let occurrence = CodeOccurrence {
                file: self.resolve_file(&entry.file),
                line: zero_based(entry.line),
                column: zero_based(entry.column),
                context: entry.context,
                field: entry.field,
            };
            match index.get(&entry.code) {
                Some(&at) => {
                    grouped[at].usage_count += 1;
                    grouped[at].ontology_defined |= entry.ontology_defined;
                    grouped[at].occurrences.push(occurrence);
                }
                None => {
                    index.insert(entry.code.clone(), grouped.len());
                    grouped.push(Code {
                        code: entry.code,
                        usage_count: 1,
                        ontology_defined: entry.ontology_defined,
                        occurrences: vec![occurrence],
                    });
                }
            }
        }
        grouped
    }

    async fn relations(&mut self) -> Vec<RelationGroup> {
        let params = self.params(None, None);
        let Some(entries) = self.fetch(&protocol::RELATIONS, params).await else {
            return Vec::new();
        };
        let Some(raw) = self.decode::<RawRelation>(&protocol::RELATIONS, entries) else {
            return Vec::new();
        };

        let mut grouped: Vec<RelationGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for entry in raw {
            let triplet = RelationTriplet {
                from: entry.from,
                to: entry.to,
                file: self.resolve_file(&entry.file),
                line: zero_based(entry.line),
                column: zero_based(entry.column),
                kind: entry.kind,
            };
            match index.get(&entry.relation) {
                Some(&at) => grouped[at].triplets.push(triplet),
                None => {
                    index.insert(entry.relation.clone(), grouped.len());
                    grouped.push(RelationGroup {
                        relation: entry.relation,
                        triplets: vec![triplet],
                    });
                }
            }
        }
        grouped
    }

    async fn relation_graph(&mut self, bibref: Option<&str>) -> Option<RelationGraph> {
        let params = self.params(bibref, None);
        let entries = self.fetch(&protocol::RELATION_GRAPH, params).await?;
        let raw = self.decode::<RawRelation>(&protocol::RELATION_GRAPH, entries)?;

        let edges: Vec<RelationEdge> = raw
            .into_iter()
            .map(|entry| RelationEdge::new(entry.from, entry.to, entry.relation))
            .collect();
        build_graph(bibref.unwrap_or("workspace"), &edges)
            .map(|diagram_source| RelationGraph { diagram_source })
    }

    async fn ontology_topics(&mut self) -> Vec<TopicNode> {
        let params = self.params(None, None);
        let Some(entries) = self.fetch(&protocol::ONTOLOGY_TOPICS, params).await else {
            return Vec::new();
        };
        let Some(raw) = self.decode::<RawTopic>(&protocol::ONTOLOGY_TOPICS, entries) else {
            return Vec::new();
        };

        let flat: Vec<TopicNode> = raw
            .into_iter()
            .map(|entry| {
                let file = self.resolve_file(&entry.file);
                TopicNode::leaf(entry.name, entry.level as usize, file, zero_based(entry.line))
            })
            .collect();
        TopicNode::build_tree(flat)
    }

    async fn ontology_annotations(&mut self, active_file: Option<&Path>) -> Vec<OntologyAnnotation> {
        let params = self.params(None, active_file);
        let Some(entries) = self.fetch(&protocol::ONTOLOGY_ANNOTATIONS, params).await else {
            return Vec::new();
        };
        let Some(raw) = self.decode::<RawAnnotation>(&protocol::ONTOLOGY_ANNOTATIONS, entries)
        else {
            return Vec::new();
        };

        let mut grouped: Vec<OntologyAnnotation> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for entry in raw {
            let occurrence = OntologyOccurrence {
                file: self.resolve_file(&entry.file),
                line: zero_based(entry.line),
                column: zero_based(entry.column),
                context: entry.context,
                field: entry.field,
                item_name: entry.item_name,
            };
            match index.get(&entry.code) {
                Some(&at) => {
                    grouped[at].ontology_defined |= entry.ontology_defined;
                    grouped[at].occurrences.push(occurrence);
                }
                None => {
                    index.insert(entry.code.clone(), grouped.len());
                    grouped.push(OntologyAnnotation {
                        code: entry.code,
                        ontology_defined: entry.ontology_defined,
                        ontology_file: entry.ontology_file.map(|file| self.resolve_file(&file)),
                        ontology_line: entry.ontology_line.map(zero_based),
                        occurrences: vec![occurrence],
                    });
                }
            }
        }
        grouped
    }
}
