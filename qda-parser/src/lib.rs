//! # qda-parser
//!
//! A parser for the QDA annotation format.
//!
//! The format is line-oriented: `SOURCE`/`ITEM`/`ONTOLOGY` blocks hold
//! `field: value` pairs (with multi-line continuation), templates declare
//! typed field definitions, and chain expressions describe relation paths
//! between codes. All parsers here have total contracts: malformed or
//! absent structure is omitted from the result, never raised as an error.
//!
//! Parsers report navigable locations (zero-based line/column plus byte
//! spans) so that editor integrations can jump back to every block, field
//! and token they extracted.

#![allow(rustdoc::invalid_html_tags)]

pub mod qda;
