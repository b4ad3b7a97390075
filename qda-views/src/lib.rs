//! # qda-views
//!
//! The normalization layer between raw corpus data and the explorer
//! surfaces that display it. One `DataProvider` interface, two
//! strategies: `RemoteProvider` asks an external language server and
//! normalizes its one-based payloads, `LocalProvider` derives the same
//! shapes straight from the workspace's text files. Every position that
//! leaves this crate is zero-based.

pub mod protocol;
pub mod provider;
pub mod refresh;
pub mod shapes;

pub use protocol::{RequestParams, ServerTransport, TransportError};
pub use provider::{DataProvider, LocalProvider, RemoteProvider};
pub use refresh::RefreshGate;
pub use shapes::{
    Code, CodeOccurrence, OntologyAnnotation, OntologyOccurrence, Reference, ReferenceOccurrence,
    RelationGraph, RelationGroup, RelationTriplet, TopicNode,
};
