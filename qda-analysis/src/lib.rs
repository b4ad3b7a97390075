//! # qda-analysis
//!
//! Derived data over parsed QDA corpora: field classification, relation
//! graph construction, occurrence back-resolution, workspace discovery
//! and bibliography lookup. Everything here is pure over parser output;
//! nothing mutates the corpus.

pub mod bib;
pub mod graph;
pub mod occurrences;
pub mod registry;
pub mod workspace;
