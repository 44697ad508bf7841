//! xsd-polish library
//!
//! Rewrites UML-tool-generated XML Schema documents to match hand-maintained
//! publication conventions, driven by a per-schema rule configuration:
//! namespace repair, generator-artifact cleanup, import/include fixup,
//! type retargeting and pretty-printed serialization.

mod cleanup;
mod config;
mod document;
mod engine;
mod namespace;
mod report;
mod rules;
mod writer;

pub use config::{Adjustment, ConfigError, Edit, Location, RuleConfig, SchemaSection, Selector};
pub use document::{Document, DocumentError, NodeData, NodeId};
pub use engine::{process, EngineError, Outcome};
pub use namespace::{NamespaceError, NamespaceTable, XSD_NS};
pub use report::Report;
pub use writer::{serialize, SerializeError};
