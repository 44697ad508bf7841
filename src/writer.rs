//! Pretty-printing schema serializer

use crate::document::{Document, NodeData, NodeId};
use crate::namespace::NamespaceTable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("no prefix declared for namespace '{0}'")]
    UnboundNamespace(String),
}

const INDENT: &str = "    ";

/// Serialize the document: XML declaration, namespace declarations on the
/// root (default namespace first), 4-space indentation, `/>` without a
/// leading space, and text-only elements kept on one line.
pub fn serialize(doc: &Document, namespaces: &NamespaceTable) -> Result<String, SerializeError> {
    let mut writer = XmlWriter::new();
    writer.write_declaration("1.0", Some("UTF-8"));
    writer.newline();
    write_element(doc, doc.root(), namespaces, &mut writer, true)?;
    Ok(writer.finish())
}

fn write_element(
    doc: &Document,
    id: NodeId,
    namespaces: &NamespaceTable,
    writer: &mut XmlWriter,
    is_root: bool,
) -> Result<(), SerializeError> {
    let node = doc.get(id);
    let name = qualified_name(node, namespaces)?;

    writer.write_indent();
    writer.write_element_start(&name);

    if is_root {
        for (prefix, uri) in namespaces.iter() {
            if prefix.is_empty() {
                writer.write_attribute("xmlns", uri);
            } else {
                writer.write_attribute(&format!("xmlns:{}", prefix), uri);
            }
        }
    }

    for (attr_name, value) in &node.attrs {
        writer.write_attribute(attr_name, value);
    }

    let text = node
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if node.children.is_empty() && text.is_none() {
        writer.write_element_end_empty();
        writer.newline();
    } else if node.children.is_empty() {
        if let Some(text) = text {
            writer.write_element_end();
            writer.write_text(text);
            writer.write_close_tag(&name);
            writer.newline();
        }
    } else {
        writer.write_element_end();
        writer.newline();
        writer.indent();
        if let Some(text) = text {
            writer.write_indent();
            writer.write_text(text);
            writer.newline();
        }
        for &child in &node.children {
            write_element(doc, child, namespaces, writer, false)?;
        }
        writer.dedent();
        writer.write_indent();
        writer.write_close_tag(&name);
        writer.newline();
    }

    Ok(())
}

/// Render a tag name against the table, preferring the default namespace.
fn qualified_name(node: &NodeData, namespaces: &NamespaceTable) -> Result<String, SerializeError> {
    match &node.ns_uri {
        None => Ok(node.local.clone()),
        Some(uri) => match namespaces.prefix_for(uri) {
            Some("") => Ok(node.local.clone()),
            Some(prefix) => Ok(format!("{}:{}", prefix, node.local)),
            None => Err(SerializeError::UnboundNamespace(uri.clone())),
        },
    }
}

/// String-building XML writer with indent management.
struct XmlWriter {
    output: String,
    indent_level: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
        }
    }

    fn finish(mut self) -> String {
        self.output = self
            .output
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        if !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(INDENT);
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    fn write_declaration(&mut self, version: &str, encoding: Option<&str>) {
        self.output.push_str("<?xml version=\"");
        self.output.push_str(&escape_attr(version));
        self.output.push('"');
        if let Some(encoding) = encoding {
            self.output.push_str(" encoding=\"");
            self.output.push_str(&escape_attr(encoding));
            self.output.push('"');
        }
        self.output.push_str("?>");
    }

    fn write_element_start(&mut self, name: &str) {
        self.output.push('<');
        self.output.push_str(name);
    }

    fn write_attribute(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        self.output.push_str(&escape_attr(value));
        self.output.push('"');
    }

    fn write_element_end(&mut self) {
        self.output.push('>');
    }

    fn write_element_end_empty(&mut self) {
        self.output.push_str("/>");
    }

    fn write_close_tag(&mut self, name: &str) {
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
    }

    fn write_text(&mut self, text: &str) {
        self.output.push_str(&escape_text(text));
    }
}

fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::namespace::XSD_NS;

    fn load(source: &str) -> (Document, NamespaceTable) {
        Document::load(source).unwrap()
    }

    #[test]
    fn test_declaration_and_root() {
        let (doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x-test"/>"#,
        );
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(output.contains(r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#));
        assert!(output.contains(r#"targetNamespace="urn:x-test""#));
        assert!(output.ends_with("\n"));
    }

    #[test]
    fn test_self_closing_without_space() {
        let (doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:element name="a"/>
               </xs:schema>"#,
        );
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.contains(r#"<xs:element name="a"/>"#));
        assert!(!output.contains(" />"));
    }

    #[test]
    fn test_four_space_indent() {
        let (doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:complexType name="T">
                   <xs:sequence>
                     <xs:element name="a"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
        );
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.contains("\n    <xs:complexType"));
        assert!(output.contains("\n        <xs:sequence>"));
        assert!(output.contains("\n            <xs:element"));
    }

    #[test]
    fn test_text_only_element_inline() {
        let (doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:documentation>
                     Air temperature
                 </xs:documentation>
               </xs:schema>"#,
        );
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.contains("<xs:documentation>Air temperature</xs:documentation>"));
    }

    #[test]
    fn test_default_namespace_first() {
        let (doc, mut namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#,
        );
        namespaces.set_default("urn:x-default");
        let output = serialize(&doc, &namespaces).unwrap();

        let xmlns_pos = output.find(r#"xmlns="urn:x-default""#).unwrap();
        let xs_pos = output.find("xmlns:xs=").unwrap();
        assert!(xmlns_pos < xs_pos);
    }

    #[test]
    fn test_default_namespace_unprefixes_elements() {
        let (doc, mut namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                          xmlns:tns="urn:x-target">
                 <tns:extra/>
               </xs:schema>"#,
        );
        namespaces.set_default("urn:x-target");
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.contains("<extra/>"));
        assert!(!output.contains("<tns:extra"));
    }

    #[test]
    fn test_escaping() {
        let (mut doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:documentation>t</xs:documentation>
               </xs:schema>"#,
        );
        let d = doc.find_first(|n| n.is_xsd("documentation")).unwrap();
        doc.get_mut(d).text = Some("a < b & c".to_string());
        doc.get_mut(d).set_attr("note", "say \"hi\"");
        let output = serialize(&doc, &namespaces).unwrap();

        assert!(output.contains("a &lt; b &amp; c"));
        assert!(output.contains("note=\"say &quot;hi&quot;\""));
    }

    #[test]
    fn test_unbound_namespace_error() {
        let (mut doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#,
        );
        let stray = doc.new_element(Some("urn:x-undeclared"), "stray");
        let root = doc.root();
        doc.append_child(root, stray);

        let result = serialize(&doc, &namespaces);
        assert!(matches!(result, Err(SerializeError::UnboundNamespace(_))));
    }

    #[test]
    fn test_round_trip_stable() {
        let (doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x-test">
                 <xs:import namespace="urn:x" schemaLocation="x.xsd"/>
                 <xs:element name="Report" type="ReportType"/>
                 <xs:complexType name="ReportType">
                   <xs:sequence>
                     <xs:element name="issueTime" type="dateTime"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
        );
        let first = serialize(&doc, &namespaces).unwrap();

        let (doc2, namespaces2) = Document::load(&first).unwrap();
        let second = serialize(&doc2, &namespaces2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_namespace_element() {
        let (mut doc, namespaces) = load(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#,
        );
        let plain = doc.new_element(None, "plain");
        let root = doc.root();
        doc.append_child(root, plain);

        let output = serialize(&doc, &namespaces).unwrap();
        assert!(output.contains("<plain/>"));
    }

    #[test]
    fn test_nested_xsd_helper() {
        let (doc, _) = load(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        assert!(doc.get(doc.root()).is(Some(XSD_NS), "schema"));
    }
}
