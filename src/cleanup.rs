//! Removal of generator artifacts from the parsed schema tree

use crate::document::{Document, NodeId};
use crate::namespace::NamespaceTable;
use crate::report::Report;
use std::collections::HashMap;

/// Strip generator artifacts down to a structurally minimal schema.
///
/// Order matters: later steps assume earlier ones removed their noise, and
/// the final sweep runs to a fixed point.
pub fn clean_tree(
    doc: &mut Document,
    namespaces: &NamespaceTable,
    allowed_abstract_features: &[String],
    report: &mut Report,
) {
    remove_unnamed_placeholders(doc, report);
    remove_generator_types(doc, report);
    remove_default_code_spaces(doc, namespaces, report);
    resolve_abstract_member_types(doc, report);
    flatten_abstract_features(doc, allowed_abstract_features);
    sweep_empty_elements(doc, namespaces, report);
}

/// Detach each victim from its parent. A victim whose parent is missing
/// from the index is reported and skipped.
fn remove_nodes(
    doc: &mut Document,
    victims: &[NodeId],
    index: &HashMap<NodeId, NodeId>,
    report: &mut Report,
) {
    for &victim in victims {
        match index.get(&victim) {
            Some(&parent) => {
                doc.remove_child(parent, victim);
            }
            None => report.invariant(format!(
                "no parent recorded for removal candidate <{}>",
                doc.get(victim).local
            )),
        }
    }
}

/// Class/instance placeholders come out of the generator as elements with an
/// empty name.
fn remove_unnamed_placeholders(doc: &mut Document, report: &mut Report) {
    let victims = doc.find_all(|n| n.is_xsd("element") && n.attr("name") == Some(""));
    if !victims.is_empty() {
        let index = doc.parent_index();
        remove_nodes(doc, &victims, &index, report);
    }
}

/// Leftover complex types literally named "Type" or "PropertyType".
fn remove_generator_types(doc: &mut Document, report: &mut Report) {
    let victims = doc.find_all(|n| {
        n.is_xsd("complexType")
            && matches!(n.attr("name"), Some("Type") | Some("PropertyType"))
    });
    if !victims.is_empty() {
        let index = doc.parent_index();
        remove_nodes(doc, &victims, &index, report);
    }
}

/// The GML extension emits a defaultCodeSpace element per code list; the
/// published schemas never carry it.
fn remove_default_code_spaces(
    doc: &mut Document,
    namespaces: &NamespaceTable,
    report: &mut Report,
) {
    let Some(gml_uri) = namespaces.get("gml").map(str::to_string) else {
        return;
    };
    let victims = doc.find_all(|n| n.is(Some(gml_uri.as_str()), "defaultCodeSpace"));
    if !victims.is_empty() {
        let index = doc.parent_index();
        remove_nodes(doc, &victims, &index, report);
    }
}

/// Replace each anonymous gml:AbstractMemberType extension with a derived
/// property-type reference on the nearest ancestor element, then drop the
/// redundant complex type.
fn resolve_abstract_member_types(doc: &mut Document, report: &mut Report) {
    let index = doc.parent_index();
    let mut removals = Vec::new();

    let extensions = doc.find_all(|n| {
        n.is_xsd("extension") && n.attr("base") == Some("gml:AbstractMemberType")
    });

    for ext in extensions {
        let Some(reference) = doc
            .subtree(ext)
            .into_iter()
            .skip(1)
            .find(|&d| doc.get(d).is_xsd("element"))
        else {
            continue;
        };
        let Some(target) = doc.get(reference).attr("ref").map(str::to_string) else {
            continue;
        };
        let derived = format!("{}PropertyType", target);

        // Ascend to the element that owns this anonymous type.
        let mut current = ext;
        let owner = loop {
            match index.get(&current) {
                Some(&parent) => {
                    if doc.get(parent).local == "element" {
                        break Some(parent);
                    }
                    current = parent;
                }
                None => break None,
            }
        };
        let Some(owner) = owner else { continue };

        doc.get_mut(owner).set_attr("type", &derived);
        removals.extend(
            doc.get(owner)
                .children
                .iter()
                .copied()
                .filter(|&c| doc.get(c).local == "complexType"),
        );
    }

    remove_nodes(doc, &removals, &index, report);
}

/// Unwrap complex types that extend gml:AbstractFeatureType for elements
/// substituting gml:AbstractFeature, unless the element is allow-listed.
fn flatten_abstract_features(doc: &mut Document, allowed: &[String]) {
    let candidates = doc.find_all(|n| {
        n.is_xsd("element")
            && n.attr("substitutionGroup") == Some("gml:AbstractFeature")
            && !n
                .attr("name")
                .is_some_and(|name| allowed.iter().any(|a| a == name))
    });

    for el in candidates {
        let Some(type_name) = doc.get(el).attr("type").map(str::to_string) else {
            continue;
        };
        let local = type_name
            .split(':')
            .nth(1)
            .unwrap_or(type_name.as_str())
            .to_string();

        let Some(complex_type) = doc.find_first(|n| {
            n.is_xsd("complexType") && n.attr("name") == Some(local.as_str())
        }) else {
            continue;
        };

        let ct_children = doc.get(complex_type).children.clone();
        if ct_children.len() != 1 {
            continue;
        }
        let content = ct_children[0];
        if !doc.get(content).is_xsd("complexContent") {
            continue;
        }
        let content_children = doc.get(content).children.clone();
        if content_children.len() != 1 {
            continue;
        }
        let extension = content_children[0];
        if !doc.get(extension).is_xsd("extension")
            || doc.get(extension).attr("base") != Some("gml:AbstractFeatureType")
        {
            continue;
        }

        // The extension's children replace the complexContent wrapper.
        let lifted = doc.get(extension).children.clone();
        doc.remove_child(complex_type, content);
        for child in lifted {
            doc.append_child(complex_type, child);
        }
        doc.get_mut(el).remove_attr("substitutionGroup");
    }
}

/// Repeatedly drop elements with no children, no attributes and no text,
/// normalize whitespace-only text, and strip the schema-prefix qualifier
/// from type values. Stops once a sweep removes nothing.
fn sweep_empty_elements(doc: &mut Document, namespaces: &NamespaceTable, report: &mut Report) {
    let type_prefix = format!("{}:", namespaces.schema_prefix());

    loop {
        let index = doc.parent_index();
        let mut empties = Vec::new();

        for id in doc.descendants() {
            let node = doc.get_mut(id);
            if node.children.is_empty() {
                if node.attrs.is_empty() && !node.has_text() {
                    empties.push(id);
                    continue;
                }
            } else if !node.has_text() {
                node.text = None;
            }

            let stripped = node
                .attr("type")
                .and_then(|t| t.strip_prefix(&type_prefix))
                .map(str::to_string);
            if let Some(value) = stripped {
                node.set_attr("type", &value);
            }
        }

        if empties.is_empty() {
            break;
        }
        remove_nodes(doc, &empties, &index, report);
    }
}
