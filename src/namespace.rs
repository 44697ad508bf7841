//! Namespace table collected from a parsed schema document

use std::collections::BTreeMap;
use thiserror::Error;

/// The XML Schema namespace.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Debug, Error)]
pub enum NamespaceError {
    /// Scoped reuse of one prefix for two URIs is not supported.
    #[error("duplicate namespace prefix '{prefix}' bound to both '{first}' and '{second}'")]
    DuplicatePrefix {
        prefix: String,
        first: String,
        second: String,
    },
}

/// Mapping from namespace prefix to URI. The empty prefix is the default
/// namespace. The serializer declares every entry exactly once on the root
/// element.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    entries: BTreeMap<String, String>,
}

impl NamespaceTable {
    /// Collect every prefix binding observed anywhere in the document.
    ///
    /// Fails if one prefix is bound to two different URIs, even in disjoint
    /// subtrees.
    pub fn collect(doc: &roxmltree::Document) -> Result<Self, NamespaceError> {
        let mut table = NamespaceTable::default();

        for node in doc.root().descendants().filter(|n| n.is_element()) {
            for ns in node.namespaces() {
                let prefix = ns.name().unwrap_or("");
                if prefix == "xml" {
                    continue;
                }
                if let Some(existing) = table.entries.get(prefix) {
                    if existing != ns.uri() {
                        return Err(NamespaceError::DuplicatePrefix {
                            prefix: prefix.to_string(),
                            first: existing.clone(),
                            second: ns.uri().to_string(),
                        });
                    }
                } else {
                    table
                        .entries
                        .insert(prefix.to_string(), ns.uri().to_string());
                }
            }
        }

        Ok(table)
    }

    /// Inject prefixes required by configuration but absent from the
    /// document. The URI is the first whitespace-delimited token of the
    /// configured "uri location" value.
    pub fn inject_required(&mut self, required: &BTreeMap<String, String>) {
        for (prefix, value) in required {
            if self.entries.contains_key(prefix) {
                continue;
            }
            if let Some(uri) = value.split_whitespace().next() {
                self.entries.insert(prefix.clone(), uri.to_string());
            }
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.entries.contains_key(prefix)
    }

    /// True when the document binds the empty prefix.
    pub fn has_default(&self) -> bool {
        self.entries.contains_key("")
    }

    /// Bind the default namespace for output.
    pub fn set_default(&mut self, uri: &str) {
        self.entries.insert(String::new(), uri.to_string());
    }

    pub fn insert(&mut self, prefix: &str, uri: &str) {
        self.entries.insert(prefix.to_string(), uri.to_string());
    }

    /// Resolve a URI back to a declared prefix. The default namespace wins
    /// when it matches; otherwise the first matching prefix in order.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    /// The prefix bound to the XML Schema namespace, "xs" when undeclared.
    pub fn schema_prefix(&self) -> &str {
        self.entries
            .iter()
            .find(|(p, u)| !p.is_empty() && u.as_str() == XSD_NS)
            .map(|(p, _)| p.as_str())
            .unwrap_or("xs")
    }

    /// Entries in order, default namespace first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
