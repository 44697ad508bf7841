//! Ordered rewrite rules driven by the rule configuration

use crate::config::{Adjustment, Edit, Selector};
use crate::document::{Document, NodeId};
use crate::namespace::{NamespaceTable, XSD_NS};
use crate::report::Report;
use std::collections::BTreeMap;

/// Reconcile the schema's import declarations with the required set.
///
/// Duplicate imports of one namespace are collapsed to the first occurrence;
/// spare duplicates are repurposed for missing required namespaces before
/// any new import element is fabricated. New imports land directly after the
/// last existing import, and newly introduced prefixes are declared through
/// the namespace table.
pub fn fix_imports(
    doc: &mut Document,
    namespaces: &mut NamespaceTable,
    required: &BTreeMap<String, String>,
    report: &mut Report,
) {
    let root = doc.root();
    let imports = doc.find_all(|n| n.is_xsd("import"));

    // First import per namespace wins; the rest are reusable spares.
    let mut first_by_uri: Vec<(String, NodeId)> = Vec::new();
    let mut spares: Vec<NodeId> = Vec::new();
    for &id in &imports {
        let uri = doc.get(id).attr("namespace").unwrap_or("").to_string();
        if first_by_uri.iter().any(|(u, _)| *u == uri) {
            spares.push(id);
        } else {
            first_by_uri.push((uri, id));
        }
    }

    let mut missing: Vec<(String, String, String)> = Vec::new();
    for (prefix, value) in required {
        let mut parts = value.split_whitespace();
        let (Some(uri), Some(location)) = (parts.next(), parts.next()) else {
            report.warn(
                "imports",
                format!("entry '{}' is not a \"uri location\" pair: {}", prefix, value),
            );
            continue;
        };
        if let Some(id) = first_by_uri
            .iter()
            .find(|(u, _)| u.as_str() == uri)
            .map(|(_, id)| *id)
        {
            doc.get_mut(id).set_attr("schemaLocation", location);
        } else {
            missing.push((prefix.clone(), uri.to_string(), location.to_string()));
        }
    }

    // Repurpose spares for missing namespaces, pairing in order.
    let reuse = missing.len().min(spares.len());
    let reused: Vec<NodeId> = spares.drain(..reuse).collect();
    let assigned: Vec<(String, String, String)> = missing.drain(..reuse).collect();
    for (id, (prefix, uri, location)) in reused.into_iter().zip(assigned) {
        let node = doc.get_mut(id);
        node.set_attr("namespace", &uri);
        node.set_attr("schemaLocation", &location);
        if !namespaces.contains_prefix(&prefix) {
            namespaces.insert(&prefix, &uri);
        }
    }

    if missing.is_empty() {
        // Everything required is imported; leftover spares go away.
        for id in spares {
            if !doc.remove_child(root, id) {
                report.invariant("duplicate import not attached to the schema root");
            }
        }
    } else {
        let mut pos = doc
            .get(root)
            .children
            .iter()
            .position(|&c| !doc.get(c).is_xsd("import"))
            .unwrap_or(doc.get(root).children.len());
        for (prefix, uri, location) in missing {
            let id = doc.new_element(Some(XSD_NS), "import");
            doc.get_mut(id).set_attr("namespace", &uri);
            doc.get_mut(id).set_attr("schemaLocation", &location);
            doc.insert_child(root, pos, id);
            pos += 1;
            if !namespaces.contains_prefix(&prefix) {
                namespaces.insert(&prefix, &uri);
            }
        }
    }
}

/// Reconcile include declarations with the required schema locations.
///
/// Required includes already present stay untouched; extra includes are
/// repointed to missing required locations in order, then deleted; required
/// locations still left over are inserted after the trailing run of
/// import/include elements.
pub fn fix_includes(doc: &mut Document, required: &[String], report: &mut Report) {
    let root = doc.root();
    let mut wanted: Vec<String> = required.to_vec();
    let mut extras: Vec<NodeId> = Vec::new();

    for id in doc.find_all(|n| n.is_xsd("include")) {
        let location = doc.get(id).attr("schemaLocation").map(str::to_string);
        match location.and_then(|l| wanted.iter().position(|w| *w == l)) {
            Some(pos) => {
                wanted.remove(pos);
            }
            None => extras.push(id),
        }
    }

    for extra in extras {
        if wanted.is_empty() {
            if !doc.remove_child(root, extra) {
                report.invariant("extra include not attached to the schema root");
            }
        } else {
            let location = wanted.remove(0);
            doc.get_mut(extra).set_attr("schemaLocation", &location);
        }
    }

    if !wanted.is_empty() {
        let mut pos = doc
            .get(root)
            .children
            .iter()
            .position(|&c| {
                let n = doc.get(c);
                !(n.is_xsd("import") || n.is_xsd("include"))
            })
            .unwrap_or(doc.get(root).children.len());
        for location in wanted {
            let id = doc.new_element(Some(XSD_NS), "include");
            doc.get_mut(id).set_attr("schemaLocation", &location);
            doc.insert_child(root, pos, id);
            pos += 1;
        }
    }
}

/// Rewrite an attribute on every element whose current value matches a
/// configured old value. Entries with zero matches are reported.
pub fn retarget_elements(
    doc: &mut Document,
    rewrites: &BTreeMap<String, String>,
    attribute: &str,
    rule: &str,
    report: &mut Report,
) {
    for (old, new) in rewrites {
        let matches =
            doc.find_all(|n| n.is_xsd("element") && n.attr(attribute) == Some(old.as_str()));
        if matches.is_empty() {
            report.warn(rule, format!("no match for {}: {},{}", attribute, old, new));
        }
        for id in matches {
            doc.get_mut(id).set_attr(attribute, new);
        }
    }
}

/// Retype code-list elements, grouped by element name.
///
/// Two independent completeness checks: configured names without a matching
/// element, and gml:CodeType elements no configuration entry covers.
pub fn fix_code_lists(
    doc: &mut Document,
    code_lists: &BTreeMap<String, String>,
    report: &mut Report,
) {
    let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
    for id in doc.find_all(|n| n.is_xsd("element") && n.attr("type") == Some("gml:CodeType")) {
        let name = doc.get(id).attr("name").unwrap_or("").to_string();
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, ids)) => ids.push(id),
            None => groups.push((name, vec![id])),
        }
    }

    let mut unprocessed: Vec<String> = groups.iter().map(|(n, _)| n.clone()).collect();
    for (name, replacement) in code_lists {
        match groups.iter().find(|(n, _)| n == name) {
            Some((_, ids)) => {
                for &id in ids {
                    doc.get_mut(id).set_attr("type", replacement);
                }
                unprocessed.retain(|n| n != name);
            }
            None => report.warn(
                "codeLists",
                format!("no match for code list entry: {},{}", name, replacement),
            ),
        }
    }

    if !unprocessed.is_empty() {
        report.warn(
            "codeLists",
            format!(
                "unprocessed gml:CodeType element(s) in schema: {}",
                unprocessed.join(" ")
            ),
        );
    }
}

/// Rewrite the base attribute of extension elements.
pub fn fix_base_extensions(
    doc: &mut Document,
    rewrites: &BTreeMap<String, String>,
    report: &mut Report,
) {
    for (old, new) in rewrites {
        let matches =
            doc.find_all(|n| n.is_xsd("extension") && n.attr("base") == Some(old.as_str()));
        if matches.is_empty() {
            report.warn("baseExtensions", format!("no match for base: {}", old));
        }
        for id in matches {
            doc.get_mut(id).set_attr("base", new);
        }
    }
}

/// The generator drops nillable="true" from the model; restore it for the
/// configured element names.
pub fn set_nil_elements(doc: &mut Document, names: &[String], report: &mut Report) {
    for name in names {
        let matches =
            doc.find_all(|n| n.is_xsd("element") && n.attr("name") == Some(name.as_str()));
        if matches.is_empty() {
            report.warn("setNilAttribute", format!("no match for {}", name));
        }
        for id in matches {
            doc.get_mut(id).set_attr("nillable", "true");
        }
    }
}

/// Attach annotation/documentation to attribute declarations that have no
/// child content yet. Missing attributes are reported.
pub fn set_attribute_docs(
    doc: &mut Document,
    docs: &BTreeMap<String, String>,
    report: &mut Report,
) {
    for (name, text) in docs {
        match doc.find_first(|n| n.is_xsd("attribute") && n.attr("name") == Some(name.as_str())) {
            Some(attr) if doc.get(attr).children.is_empty() => {
                let annotation = doc.new_element(Some(XSD_NS), "annotation");
                let documentation = doc.new_element(Some(XSD_NS), "documentation");
                doc.get_mut(documentation).text = Some(text.clone());
                doc.append_child(annotation, documentation);
                doc.append_child(attr, annotation);
            }
            Some(_) => {}
            None => report.warn(
                "attributeDocStrings",
                format!("missing attribute in schema: {}", name),
            ),
        }
    }
}

/// Free-form one-off fixups: each adjustment selects one element by
/// attribute match and sets the comma-aligned attribute/value pairs.
pub fn apply_adjustments(doc: &mut Document, adjustments: &[Adjustment], report: &mut Report) {
    for adjustment in adjustments {
        let Some(id) = doc.find_first(|n| {
            n.is_xsd("element") && n.attr(&adjustment.kind) == Some(adjustment.value.as_str())
        }) else {
            report.warn(
                "adjustments",
                format!("no element with {}=\"{}\"", adjustment.kind, adjustment.value),
            );
            continue;
        };
        for (name, value) in adjustment
            .attributes
            .split(',')
            .zip(adjustment.values.split(','))
        {
            doc.get_mut(id).set_attr(name, value);
        }
    }
}

fn select(doc: &Document, selector: &Selector) -> Option<NodeId> {
    doc.find_first(|n| {
        n.local == selector.element
            && match (&selector.attribute, &selector.value) {
                (Some(attribute), Some(value)) => n.attr(attribute) == Some(value.as_str()),
                (Some(attribute), None) => n.attr(attribute).is_some(),
                _ => true,
            }
    })
}

fn report_miss(report: &mut Report, selector: &Selector) {
    report.warn(
        "edits",
        format!("no element matches selector '{}'", selector.element),
    );
}

/// Apply the typed edit primitives in configuration order.
pub fn apply_edits(doc: &mut Document, edits: &[Edit], report: &mut Report) {
    for edit in edits {
        match edit {
            Edit::SetAttribute {
                select: selector,
                name,
                value,
            } => match select(doc, selector) {
                Some(id) => doc.get_mut(id).set_attr(name, value),
                None => report_miss(report, selector),
            },
            Edit::DeleteAttribute {
                select: selector,
                name,
            } => match select(doc, selector) {
                Some(id) => {
                    doc.get_mut(id).remove_attr(name);
                }
                None => report_miss(report, selector),
            },
            Edit::MoveSubtree {
                select: selector,
                to,
            } => {
                let Some(node) = select(doc, selector) else {
                    report_miss(report, selector);
                    continue;
                };
                let Some(target) = select(doc, to) else {
                    report_miss(report, to);
                    continue;
                };
                if node == target || doc.is_in_subtree(node, target) {
                    report.warn("edits", "cannot move an element into its own subtree");
                    continue;
                }
                let index = doc.parent_index();
                match index.get(&node) {
                    Some(&parent) => {
                        doc.remove_child(parent, node);
                        doc.append_child(target, node);
                    }
                    None => report.invariant("move source has no parent in the current index"),
                }
            }
            Edit::CloneSubtree {
                select: selector,
                to,
            } => {
                let Some(node) = select(doc, selector) else {
                    report_miss(report, selector);
                    continue;
                };
                let Some(target) = select(doc, to) else {
                    report_miss(report, to);
                    continue;
                };
                let copy = doc.clone_subtree(node);
                doc.append_child(target, copy);
            }
        }
    }
}

/// The generator never emits attributeFormDefault on the schema root.
pub fn ensure_attribute_form_default(doc: &mut Document) {
    let root = doc.root();
    if doc.get(root).attr("attributeFormDefault").is_none() {
        doc.get_mut(root)
            .set_attr("attributeFormDefault", "unqualified");
    }
}
