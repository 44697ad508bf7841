//! Per-file orchestration of the transformation pipeline

use crate::cleanup;
use crate::config::RuleConfig;
use crate::document::{Document, DocumentError};
use crate::report::Report;
use crate::rules;
use crate::writer::{self, SerializeError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Missing schema file in EA directory: {0}")]
    MissingSchema(PathBuf),
    #[error("Failed to read {path}: {source}")]
    ReadSchema {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("Failed to write {path}: {source}")]
    WriteSchema {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of processing one schema file.
#[derive(Debug)]
pub struct Outcome {
    /// Destination path of the rewritten schema, None when skipped.
    pub output: Option<PathBuf>,
    /// Reason the file was skipped without writing output.
    pub skipped: Option<String>,
    pub report: Report,
}

/// Run the full pipeline for one schema file.
///
/// Source is `base/EADirectory/name`, destination
/// `base/ReleaseDirectory/name`. Rule groups without configuration are
/// skipped; advisory diagnostics land in the returned report.
pub fn process(config: &RuleConfig, base_dir: &Path) -> Result<Outcome, EngineError> {
    let source_path = base_dir
        .join(&config.location.ea_directory)
        .join(&config.schema.name);
    let dest_path = base_dir
        .join(&config.location.release_directory)
        .join(&config.schema.name);

    if !source_path.is_file() {
        return Err(EngineError::MissingSchema(source_path));
    }
    let source = fs::read_to_string(&source_path).map_err(|e| EngineError::ReadSchema {
        path: source_path.clone(),
        source: e,
    })?;

    let (mut doc, mut namespaces) = Document::load(&source)?;

    // A schema that already binds a default namespace is not processed.
    if namespaces.has_default() {
        return Ok(Outcome {
            output: None,
            skipped: Some("document already binds a default namespace".to_string()),
            report: Report::default(),
        });
    }

    if let Some(imports) = &config.imports {
        namespaces.inject_required(imports);
    }

    let mut report = Report::default();
    let allowed = config
        .allowed_gml_abstract_features
        .clone()
        .unwrap_or_default();
    cleanup::clean_tree(&mut doc, &namespaces, &allowed, &mut report);

    if let Some(imports) = &config.imports {
        rules::fix_imports(&mut doc, &mut namespaces, imports, &mut report);
    }
    if let Some(includes) = &config.includes {
        let locations: Vec<String> = includes.values().cloned().collect();
        rules::fix_includes(&mut doc, &locations, &mut report);
    }
    if let Some(data_types) = &config.data_types {
        rules::retarget_elements(&mut doc, data_types, "type", "dataTypes", &mut report);
    }
    if let Some(groups) = &config.substitution_groups {
        rules::retarget_elements(
            &mut doc,
            groups,
            "substitutionGroup",
            "substitutionGroups",
            &mut report,
        );
    }
    if let Some(code_lists) = &config.code_lists {
        rules::fix_code_lists(&mut doc, code_lists, &mut report);
    }
    if let Some(bases) = &config.base_extensions {
        rules::fix_base_extensions(&mut doc, bases, &mut report);
    }
    if let Some(names) = &config.set_nil_attribute {
        rules::set_nil_elements(&mut doc, names, &mut report);
    }
    if let Some(docs) = &config.attribute_doc_strings {
        rules::set_attribute_docs(&mut doc, docs, &mut report);
    }
    if let Some(adjustments) = &config.adjustments {
        rules::apply_adjustments(&mut doc, adjustments, &mut report);
    }
    if let Some(edits) = &config.edits {
        rules::apply_edits(&mut doc, edits, &mut report);
    }
    rules::ensure_attribute_form_default(&mut doc);

    // The writer declares the default namespace directly, so one pass is
    // enough.
    namespaces.set_default(&config.schema.default_namespace);
    let output = writer::serialize(&doc, &namespaces)?;
    fs::write(&dest_path, output).map_err(|e| EngineError::WriteSchema {
        path: dest_path.clone(),
        source: e,
    })?;

    Ok(Outcome {
        output: Some(dest_path),
        skipped: None,
        report,
    })
}
