//! Data provider strategies.
//!
//! One interface, two implementations. `RemoteProvider` drives the
//! external language server; `LocalProvider` re-derives the same shapes
//! from workspace text. Callers depend only on the trait, so the two can
//! never drift apart at the contract level.

use std::path::Path;

use async_trait::async_trait;

use crate::shapes::{Code, OntologyAnnotation, Reference, RelationGraph, RelationGroup, TopicNode};

mod local;
mod remote;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

/// The six view queries. Every operation is total: failures degrade to
/// the canonical empty value (empty list, or `None` for the graph) and
/// are surfaced as logged warnings, never as errors the caller must
/// handle.
#[async_trait]
pub trait DataProvider {
    async fn references(&mut self) -> Vec<Reference>;
    async fn codes(&mut self) -> Vec<Code>;
    async fn relations(&mut self) -> Vec<RelationGroup>;
    async fn relation_graph(&mut self, bibref: Option<&str>) -> Option<RelationGraph>;
    async fn ontology_topics(&mut self) -> Vec<TopicNode>;
    async fn ontology_annotations(&mut self, active_file: Option<&Path>) -> Vec<OntologyAnnotation>;
}
