// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource
//!
//! Caller-side resource descriptors, the API collection they resolve to, and
//! the loosely typed documents fetched from the cluster.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identity accessors over open-ended resource documents

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Caller intent: which resources to fetch. Not yet resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuery {
    /// "v1" or "group/version". Empty means the core group.
    #[serde(default)]
    pub api_version: String,

    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Set → single-item fetch. Empty → filtered list.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_selector: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_selector: String,
}

impl ResourceQuery {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = selector.into();
        self
    }

    pub fn with_field_selector(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = selector.into();
        self
    }

    /// The apiVersion with the core-group default applied
    pub fn effective_api_version(&self) -> &str {
        if self.api_version.is_empty() {
            "v1"
        } else {
            &self.api_version
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        non_empty(&self.namespace)
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    pub fn label_selector(&self) -> Option<&str> {
        non_empty(&self.label_selector)
    }

    pub fn field_selector(&self) -> Option<&str> {
        non_empty(&self.field_selector)
    }

    /// Pre-flight check. `kind` is always required; `apiVersion` may be empty
    /// (core group) at the resolver level, but the request boundary demands it.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_version.trim().is_empty() {
            return Err("apiVersion is required".to_string());
        }
        if self.kind.trim().is_empty() {
            return Err("kind is required".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.effective_api_version(), self.kind)?;
        if let Some(ns) = self.namespace() {
            write!(f, " namespace={}", ns)?;
        }
        if let Some(name) = self.name() {
            write!(f, " name={}", name)?;
        }
        if let Some(selector) = self.label_selector() {
            write!(f, " labelSelector={}", selector)?;
        }
        if let Some(selector) = self.field_selector() {
            write!(f, " fieldSelector={}", selector)?;
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Concrete API collection identity (group, version, plural resource)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocator {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl ResourceLocator {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// "v1" for the core group, "group/version" otherwise
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// REST path of the collection, optionally scoped to a namespace
    pub fn collection_path(&self, namespace: Option<&str>) -> String {
        let root = if self.group.is_empty() {
            format!("/api/{}", self.version)
        } else {
            format!("/apis/{}/{}", self.group, self.version)
        };
        match namespace {
            Some(ns) => format!("{}/namespaces/{}/{}", root, ns, self.resource),
            None => format!("{}/{}", root, self.resource),
        }
    }

    /// REST path of one named item
    pub fn item_path(&self, namespace: Option<&str>, name: &str) -> String {
        format!("{}/{}", self.collection_path(namespace), name)
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// Identity fields of a resource, as reported back to callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Read-only snapshot of a cluster object. The document keeps key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedResource(Value);

impl ResolvedResource {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    pub fn document(&self) -> &Value {
        &self.0
    }

    pub fn api_version(&self) -> &str {
        self.top_level_str("apiVersion")
    }

    pub fn kind(&self) -> &str {
        self.top_level_str("kind")
    }

    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    pub fn uid(&self) -> &str {
        self.metadata_str("uid")
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
            uid: self.uid().to_string(),
        }
    }

    /// Fill in apiVersion/kind when absent. List responses omit them per item.
    pub fn stamp_type(&mut self, api_version: &str, kind: &str) {
        if let Value::Object(map) = &mut self.0 {
            if !matches!(map.get("apiVersion"), Some(Value::String(s)) if !s.is_empty()) {
                map.insert("apiVersion".to_string(), Value::String(api_version.to_string()));
            }
            if !matches!(map.get("kind"), Some(Value::String(s)) if !s.is_empty()) {
                map.insert("kind".to_string(), Value::String(kind.to_string()));
            }
        }
    }

    fn top_level_str(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata").and_then(Value::as_object)
    }

    fn metadata_str(&self, key: &str) -> &str {
        self.metadata()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.metadata()
            .and_then(|m| m.get(key))
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Value> for ResolvedResource {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}
