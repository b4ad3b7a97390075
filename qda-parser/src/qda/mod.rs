//! The QDA format layer.
//!
//! Module layout follows the parsing pipeline, leaves first:
//!
//! - [`location`]: byte offset to line/column conversion
//! - [`fields`]: the shared `field: value` line grammar
//! - [`blocks`]: `SOURCE`/`ITEM` block extraction
//! - [`ontology`]: `ONTOLOGY` block extraction with repeat-aware fields
//! - [`template`]: `FIELD ... END FIELD` schema declarations
//! - [`project`]: project descriptor loading
//! - [`chain`]: arrow-separated chain expressions

pub mod blocks;
pub mod chain;
pub mod fields;
pub mod location;
pub mod ontology;
pub mod project;
pub mod template;

pub use blocks::{item_counts, parse_blocks, Block, BlockKeyword};
pub use chain::{parse_chain, parse_chain_with, ChainKind, ChainParse, DEFAULT_RELATION};
pub use fields::{FieldEntry, FieldValue, RepeatPolicy};
pub use location::{LineIndex, Position, Range};
pub use ontology::{parse_ontology_blocks, OntologyBlock};
pub use project::{load_project, parse_project, LoaderError, ProjectDescriptor};
pub use template::{
    default_field_definitions, parse_template, Arity, ArityOp, EnumValue, FieldDefinition,
    FieldScope, FieldType,
};
