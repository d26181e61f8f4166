// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy Loader
//!
//! Parses policy sources into `PolicyDefinition`s.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Anti-corruption layer between policy YAML and the domain
//! - **Integration:** file / directory / bundle key → YAML documents → domain
//!
//! A source is a file, a directory, or a curated bundle key. An existing
//! path always wins over a bundle key of the same name. Every YAML document
//! is read first as one policy and then, if that fails, as a policy list
//! (`kind: *List` with `items`, or a bare sequence).

use crate::domain::errors::ScanError;
use crate::domain::policy::{FailureAction, PolicyDefinition, PolicyRule, PolicyScope};
use crate::infrastructure::bundles;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

const POLICY_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

#[derive(Debug, Clone, Default)]
pub struct PolicyLoader {
    recursive: bool,
}

#[derive(Deserialize)]
struct RawPolicy {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    spec: RawSpec,
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    annotations: BTreeMap<String, YamlValue>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawSpec {
    #[serde(default)]
    validation_failure_action: Option<FailureAction>,
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

impl PolicyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into sub-directories when loading a directory
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Load one source. Never returns an empty list on success.
    pub fn load(&self, source: &str) -> Result<Vec<PolicyDefinition>, ScanError> {
        let path = Path::new(source);
        let policies = if path.is_dir() {
            self.load_dir(path)?
        } else if path.is_file() {
            load_file(path)?
        } else if let Some(content) = bundles::content(source) {
            debug!(bundle = source, "Loading curated policy bundle");
            parse_documents(&content).map_err(|message| {
                ScanError::source_error(format!("bundle:{}", source), message)
            })?
        } else {
            return Err(ScanError::source_error(source, "path does not exist"));
        };

        if policies.is_empty() {
            return Err(ScanError::source_error(source, "no valid policy found"));
        }

        info!(source, count = policies.len(), "Loaded policies");
        Ok(policies)
    }

    /// Load several sources, aborting on the first failure
    pub fn load_all(&self, sources: &[String]) -> Result<Vec<PolicyDefinition>, ScanError> {
        let mut policies = Vec::new();
        for source in sources {
            policies.extend(self.load(source)?);
        }
        Ok(policies)
    }

    fn load_dir(&self, dir: &Path) -> Result<Vec<PolicyDefinition>, ScanError> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ScanError::source_error(dir.display().to_string(), e.to_string())
            })?;
            if entry.file_type().is_file() && has_policy_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        if files.is_empty() {
            return Err(ScanError::source_error(
                dir.display().to_string(),
                "directory contains no policy files",
            ));
        }

        let mut policies = Vec::new();
        for file in &files {
            policies.extend(load_file(file)?);
        }
        debug!(dir = %dir.display(), files = files.len(), "Loaded policy directory");
        Ok(policies)
    }
}

fn has_policy_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| POLICY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_file(path: &Path) -> Result<Vec<PolicyDefinition>, ScanError> {
    let source_ref = path.display().to_string();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScanError::source_error(&source_ref, format!("unreadable: {}", e)))?;
    parse_documents(&content).map_err(|message| ScanError::source_error(&source_ref, message))
}

/// Parse a (possibly multi-document) YAML stream
pub fn parse_documents(content: &str) -> Result<Vec<PolicyDefinition>, String> {
    let mut policies = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = YamlValue::deserialize(document)
            .map_err(|e| format!("document {}: invalid YAML: {}", index + 1, e))?;
        if value.is_null() {
            continue;
        }
        let parsed = parse_single(&value, None)
            .or_else(|single_err| {
                parse_list(&value).map_err(|list_err| {
                    format!(
                        "document {} is neither a policy ({}) nor a policy list ({})",
                        index + 1,
                        single_err,
                        list_err
                    )
                })
            })?;
        policies.extend(parsed);
    }
    Ok(policies)
}

fn parse_single(
    value: &YamlValue,
    kind_hint: Option<&str>,
) -> Result<Vec<PolicyDefinition>, String> {
    if !value.is_mapping() {
        return Err("not a mapping".to_string());
    }
    let raw: RawPolicy = serde_yaml::from_value(value.clone()).map_err(|e| e.to_string())?;

    let kind = if raw.kind.is_empty() {
        kind_hint.unwrap_or_default()
    } else {
        raw.kind.as_str()
    };
    let scope = match kind {
        "ClusterPolicy" => PolicyScope::Cluster,
        "Policy" => PolicyScope::Namespaced,
        "" => return Err("missing kind".to_string()),
        other => return Err(format!("kind '{}' is not a policy", other)),
    };
    if raw.metadata.name.is_empty() {
        return Err("policy has no metadata.name".to_string());
    }

    let annotations = raw
        .metadata
        .annotations
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(&value).map(|v| (key, v)))
        .collect();

    Ok(vec![PolicyDefinition {
        name: raw.metadata.name,
        namespace: raw.metadata.namespace,
        scope,
        failure_action: raw.spec.validation_failure_action.unwrap_or_default(),
        annotations,
        rules: raw.spec.rules,
    }])
}

fn parse_list(value: &YamlValue) -> Result<Vec<PolicyDefinition>, String> {
    let (items, kind_hint) = match value {
        YamlValue::Sequence(items) => (items, None),
        YamlValue::Mapping(map) => {
            let kind = map.get("kind").and_then(YamlValue::as_str).unwrap_or_default();
            let items = map
                .get("items")
                .and_then(YamlValue::as_sequence)
                .ok_or_else(|| "no items".to_string())?;
            (items, kind.strip_suffix("List"))
        }
        _ => return Err("not a list".to_string()),
    };

    let mut policies = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let parsed =
            parse_single(item, kind_hint).map_err(|e| format!("item {}: {}", index, e))?;
        policies.extend(parsed);
    }
    Ok(policies)
}

fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
