//! Owned mutable document tree for schema surgery

use crate::namespace::{NamespaceError, NamespaceTable, XSD_NS};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to parse XML: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

/// Handle to an element in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One element: qualified tag, attributes in document order, optional text
/// content, ordered children.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub ns_uri: Option<String>,
    pub local: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<NodeId>,
}

impl NodeData {
    fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self {
            ns_uri: ns_uri.map(String::from),
            local: local.to_string(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.attrs.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn is(&self, ns_uri: Option<&str>, local: &str) -> bool {
        self.ns_uri.as_deref() == ns_uri && self.local == local
    }

    /// True for an element in the XML Schema namespace with this local name.
    pub fn is_xsd(&self, local: &str) -> bool {
        self.is(Some(XSD_NS), local)
    }

    /// True when text content carries anything beyond whitespace.
    pub fn has_text(&self) -> bool {
        self.text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Arena-backed element tree. Nodes carry no parent back-reference; upward
/// navigation goes through [`Document::parent_index`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Parse a schema source, collect its namespace table and copy the
    /// element tree into a mutable arena.
    pub fn load(source: &str) -> Result<(Document, NamespaceTable), DocumentError> {
        let parsed = roxmltree::Document::parse(source)?;
        let namespaces = NamespaceTable::collect(&parsed)?;
        let doc = Document::from_parsed(&parsed, &namespaces);
        Ok((doc, namespaces))
    }

    fn from_parsed(parsed: &roxmltree::Document, namespaces: &NamespaceTable) -> Document {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = doc.copy_element(&parsed.root_element(), namespaces);
        doc.root = root;
        doc
    }

    fn copy_element(&mut self, node: &roxmltree::Node, namespaces: &NamespaceTable) -> NodeId {
        let mut data = NodeData::new(node.tag_name().namespace(), node.tag_name().name());

        for attr in node.attributes() {
            let name = match attr.namespace() {
                Some(uri) => match namespaces.prefix_for(uri) {
                    Some(prefix) if !prefix.is_empty() => {
                        format!("{}:{}", prefix, attr.name())
                    }
                    _ => attr.name().to_string(),
                },
                None => attr.name().to_string(),
            };
            data.attrs.push((name, attr.value().to_string()));
        }

        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        if !text.trim().is_empty() {
            data.text = Some(text);
        }

        let id = self.push(data);
        for child in node.children().filter(|c| c.is_element()) {
            let child_id = self.copy_element(&child, namespaces);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Create a detached element.
    pub fn new_element(&mut self, ns_uri: Option<&str>, local: &str) -> NodeId {
        self.push(NodeData::new(ns_uri, local))
    }

    /// All elements reachable from the root, in document order.
    pub fn descendants(&self) -> Vec<NodeId> {
        self.subtree(self.root)
    }

    /// The subtree rooted at `id`, in document order, `id` first.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn find_all(&self, pred: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| pred(self.get(id)))
            .collect()
    }

    pub fn find_first(&self, pred: impl Fn(&NodeData) -> bool) -> Option<NodeId> {
        self.descendants().into_iter().find(|&id| pred(self.get(id)))
    }

    /// Child-to-parent lookup over the whole tree. Invalidated by any
    /// structural mutation; callers rebuild it after surgery.
    pub fn parent_index(&self) -> HashMap<NodeId, NodeId> {
        let mut index = HashMap::new();
        for id in self.descendants() {
            for &child in &self.nodes[id.0].children {
                index.insert(child, id);
            }
        }
        index
    }

    /// Detach `child` from `parent`. False when `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == child) {
            Some(pos) => {
                children.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
    }

    /// Deep-copy the subtree rooted at `id`; the copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let mut data = self.nodes[id.0].clone();
        let children = std::mem::take(&mut data.children);
        let copy = self.push(data);
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// True when `node` lies inside the subtree rooted at `ancestor`.
    pub fn is_in_subtree(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.subtree(ancestor).contains(&node)
    }
}
