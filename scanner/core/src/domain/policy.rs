// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy Definitions
//!
//! Parsed policy-as-code documents: a named policy with an ordered rule list.
//! The rule blocks (validate / mutate / generate) stay as raw documents because
//! their semantics belong to the evaluation engine, not to this crate.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Policy, rule and match-criteria value types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const ANNOTATION_SCORED: &str = "policies.kyverno.io/scored";
pub const ANNOTATION_CATEGORY: &str = "policies.kyverno.io/category";
pub const ANNOTATION_SEVERITY: &str = "policies.kyverno.io/severity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    Cluster,
    Namespaced,
}

/// What happens when a validate rule fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureAction {
    #[default]
    Audit,
    Enforce,
}

impl FailureAction {
    pub fn is_audit(self) -> bool {
        matches!(self, Self::Audit)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "audit" => Some(Self::Audit),
            "enforce" => Some(Self::Enforce),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for FailureAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid validationFailureAction '{}', expected Audit or Enforce",
                raw
            ))
        })
    }
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audit => write!(f, "audit"),
            Self::Enforce => write!(f, "enforce"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Validate,
    Mutate,
    Generate,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => write!(f, "validate"),
            Self::Mutate => write!(f, "mutate"),
            Self::Generate => write!(f, "generate"),
        }
    }
}

/// Label selector restricted to exact label matches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// Resource description inside a match or exclude block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescription {
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

impl ResourceDescription {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.names.is_empty()
            && self.name.is_none()
            && self.namespaces.is_empty()
            && self.selector.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    #[serde(default)]
    pub resources: ResourceDescription,
}

/// `match` / `exclude` block: a direct description, or any/all filter lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,
}

impl MatchCriteria {
    pub fn is_empty(&self) -> bool {
        self.resources.as_ref().map_or(true, ResourceDescription::is_empty)
            && self.any.is_empty()
            && self.all.is_empty()
    }

    /// Every kind named anywhere in the block, in declaration order
    pub fn kinds(&self) -> Vec<&str> {
        let direct = self.resources.iter().flat_map(|r| r.kinds.iter());
        let filters = self
            .any
            .iter()
            .chain(self.all.iter())
            .flat_map(|f| f.resources.kinds.iter());
        direct.chain(filters).map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,

    #[serde(default, rename = "match")]
    pub match_criteria: MatchCriteria,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<MatchCriteria>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutate: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<Value>,
}

impl PolicyRule {
    /// Rule kind from the populated block.
    ///
    /// Tie-break when several blocks are populated: validate, then mutate,
    /// then generate. A rule with no block at all is treated as validate.
    pub fn kind(&self) -> RuleKind {
        if is_populated(&self.validate) {
            RuleKind::Validate
        } else if is_populated(&self.mutate) {
            RuleKind::Mutate
        } else if is_populated(&self.generate) {
            RuleKind::Generate
        } else {
            RuleKind::Validate
        }
    }
}

fn is_populated(block: &Option<Value>) -> bool {
    matches!(block, Some(value) if !value.is_null())
}

/// Policy-level flags the report classifier needs for each outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTraits {
    pub scored: bool,
    pub failure_action: FailureAction,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
}

impl Default for PolicyTraits {
    fn default() -> Self {
        Self {
            scored: true,
            failure_action: FailureAction::Audit,
            category: String::new(),
            severity: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub scope: PolicyScope,
    #[serde(default)]
    pub failure_action: FailureAction,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub rules: Vec<PolicyRule>,
}

impl PolicyDefinition {
    /// `scored` defaults to true unless the annotation is literally "false"
    pub fn scored(&self) -> bool {
        !matches!(
            self.annotations.get(ANNOTATION_SCORED).map(|v| v.trim().to_ascii_lowercase()),
            Some(v) if v == "false"
        )
    }

    pub fn category(&self) -> &str {
        self.annotations
            .get(ANNOTATION_CATEGORY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn severity(&self) -> &str {
        self.annotations
            .get(ANNOTATION_SEVERITY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn traits(&self) -> PolicyTraits {
        PolicyTraits {
            scored: self.scored(),
            failure_action: self.failure_action,
            category: self.category().to_string(),
            severity: self.severity().to_string(),
        }
    }
}
