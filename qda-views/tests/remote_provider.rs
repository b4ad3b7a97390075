//! Behavior of the server-backed provider against a scripted transport:
//! alias fallback, circuit breaking, degradation signalling and payload
//! normalization.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use qda_views::{DataProvider, RemoteProvider, RequestParams, ServerTransport, TransportError};

#[derive(Clone, Default)]
struct MockTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    scripted: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: &str, outcome: Result<Value, TransportError>) {
        self.inner
            .scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerTransport for MockTransport {
    async fn request(&self, method: &str, _params: &RequestParams) -> Result<Value, TransportError> {
        self.inner.calls.lock().unwrap().push(method.to_string());
        self.inner
            .scripted
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(TransportError::Failed("unscripted method".to_string())))
    }
}

fn empty_ok(payload_key: &str) -> Result<Value, TransportError> {
    Ok(json!({"success": true, payload_key: []}))
}

#[tokio::test]
async fn method_not_found_trips_the_circuit_breaker() {
    let transport = MockTransport::new();
    transport.script("qda/references", Err(TransportError::MethodNotFound));
    transport.script("qda/listReferences", Err(TransportError::MethodNotFound));

    let mut provider = RemoteProvider::new(transport.clone(), "/work");
    assert!(provider.references().await.is_empty());
    assert_eq!(transport.calls(), vec!["qda/references", "qda/listReferences"]);

    // Known unsupported: no further round-trips.
    assert!(provider.references().await.is_empty());
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn legacy_alias_answers_when_the_primary_is_unknown() {
    let transport = MockTransport::new();
    transport.script("qda/codes", Err(TransportError::MethodNotFound));
    transport.script(
        "qda/listCodes",
        Ok(json!({
            "success": true,
            "codes": [{
                "code": "alert fatigue",
                "ontologyDefined": true,
                "file": "notes.qda",
                "line": 5,
                "column": 11,
                "context": "code: alert fatigue",
                "field": "code",
            }],
        })),
    );

    let mut provider = RemoteProvider::new(transport.clone(), "/work");
    let codes = provider.codes().await;
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code, "alert fatigue");
    assert!(codes[0].ontology_defined);
    // One-based wire positions arrive zero-based.
    assert_eq!(codes[0].occurrences[0].line, 4);
    assert_eq!(codes[0].occurrences[0].column, 10);
    assert_eq!(transport.calls(), vec!["qda/codes", "qda/listCodes"]);
}

#[tokio::test]
async fn alias_is_not_tried_on_other_failures() {
    let transport = MockTransport::new();
    transport.script(
        "qda/references",
        Err(TransportError::Failed("index rebuild in progress".to_string())),
    );

    let mut provider = RemoteProvider::new(transport.clone(), "/work");
    assert!(provider.references().await.is_empty());
    assert_eq!(transport.calls(), vec!["qda/references"]);

    // Not a circuit break: the next call goes to the server again.
    transport.script("qda/references", empty_ok("references"));
    provider.references().await;
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn scattered_entries_group_by_bibref() {
    let transport = MockTransport::new();
    transport.script(
        "qda/references",
        Ok(json!({
            "success": true,
            "references": [
                {"bibref": "@ref1", "file": "a.qda", "line": 1, "itemCount": 2},
                {"bibref": "@ref2", "file": "a.qda", "line": 20, "itemCount": 1},
                {"bibref": "@ref1", "file": "b.qda", "line": 3, "itemCount": 3},
            ],
        })),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    let references = provider.references().await;
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].bibref, "@ref1");
    assert_eq!(references[0].item_count, 5);
    assert_eq!(references[0].occurrences.len(), 2);
    assert_eq!(references[1].bibref, "@ref2");
}

#[tokio::test]
async fn file_uris_decode_to_workspace_relative_paths() {
    let transport = MockTransport::new();
    transport.script(
        "qda/references",
        Ok(json!({
            "success": true,
            "references": [
                {"bibref": "@a", "file": "file:///work/notes%20dir/a.qda", "line": 1, "itemCount": 1},
                {"bibref": "@b", "file": "b.qda", "line": 1, "itemCount": 1},
            ],
        })),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    let references = provider.references().await;
    assert_eq!(references[0].occurrences[0].file, "notes dir/a.qda");
    assert_eq!(references[1].occurrences[0].file, "b.qda");
}

#[tokio::test]
async fn malformed_payload_degrades_to_empty() {
    let transport = MockTransport::new();
    transport.script(
        "qda/references",
        Ok(json!({
            "success": true,
            "references": [{"bibref": "@a"}],
        })),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    assert!(provider.references().await.is_empty());
}

#[tokio::test]
async fn failed_envelope_degrades_to_empty() {
    let transport = MockTransport::new();
    transport.script(
        "qda/references",
        Ok(json!({"success": false, "error": "index not built"})),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    assert!(provider.references().await.is_empty());
}

#[tokio::test]
async fn three_empty_successes_fire_the_degraded_signal_once() {
    let transport = MockTransport::new();
    transport.script("qda/references", empty_ok("references"));
    transport.script("qda/codes", empty_ok("codes"));
    transport.script("qda/relations", empty_ok("relations"));
    transport.script("qda/ontologyTopics", empty_ok("topics"));

    let mut provider = RemoteProvider::new(transport, "/work");
    provider.references().await;
    assert!(!provider.take_degraded_signal());
    provider.codes().await;
    assert!(!provider.take_degraded_signal());
    provider.relations().await;
    assert!(provider.take_degraded_signal());

    // A fourth empty response does not re-fire.
    provider.ontology_topics().await;
    assert!(!provider.take_degraded_signal());
}

#[tokio::test]
async fn a_non_empty_payload_resets_the_streak() {
    let transport = MockTransport::new();
    transport.script("qda/references", empty_ok("references"));
    transport.script("qda/codes", empty_ok("codes"));
    transport.script(
        "qda/relations",
        Ok(json!({
            "success": true,
            "relations": [{
                "relation": "enables",
                "from": "a",
                "to": "b",
                "file": "a.qda",
                "line": 2,
                "column": 1,
                "type": "qualified",
            }],
        })),
    );
    transport.script("qda/ontologyTopics", empty_ok("topics"));

    let mut provider = RemoteProvider::new(transport, "/work");
    provider.references().await;
    provider.codes().await;
    provider.relations().await;
    provider.ontology_topics().await;
    assert!(!provider.take_degraded_signal());
}

#[tokio::test]
async fn graph_payload_renders_diagram_source() {
    let transport = MockTransport::new();
    transport.script(
        "qda/relationGraph",
        Ok(json!({
            "success": true,
            "relations": [
                {"relation": "enables", "from": "alert fatigue", "to": "missed alarms",
                 "file": "a.qda", "line": 2, "column": 1, "type": "qualified"},
            ],
        })),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    let graph = provider.relation_graph(Some("@ref1")).await.unwrap();
    assert!(graph.diagram_source.starts_with("graph TD"));
    assert!(graph.diagram_source.contains("%% relations for @ref1"));
    assert!(graph.diagram_source.contains("missed_alarms[\"missed alarms\"]:::enable"));
}

#[tokio::test]
async fn empty_graph_payload_is_none() {
    let transport = MockTransport::new();
    transport.script("qda/relationGraph", empty_ok("relations"));

    let mut provider = RemoteProvider::new(transport, "/work");
    assert!(provider.relation_graph(Some("@ref1")).await.is_none());
}

#[tokio::test]
async fn topic_payload_builds_a_tree() {
    let transport = MockTransport::new();
    transport.script(
        "qda/ontologyTopics",
        Ok(json!({
            "success": true,
            "topics": [
                {"name": "usability", "level": 0, "file": "onto.qdo", "line": 1},
                {"name": "alert fatigue", "level": 1, "file": "onto.qdo", "line": 3},
                {"name": "reliability", "level": 0, "file": "onto.qdo", "line": 9},
            ],
        })),
    );

    let mut provider = RemoteProvider::new(transport, "/work");
    let topics = provider.ontology_topics().await;
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].children.len(), 1);
    assert_eq!(topics[0].children[0].name, "alert fatigue");
    assert_eq!(topics[0].children[0].line, 2);
}
