// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Rule Outcomes
//!
//! Raw result of evaluating one rule against one resource, before any
//! scoring or audit/enforce classification.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Hand-off shape between orchestration and classification

use crate::domain::policy::{PolicyTraits, RuleKind};
use crate::domain::resource::ResourceIdentity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Status reported by the evaluation engine.
///
/// Engines are external, so a status outside the known set is kept verbatim
/// in `Unrecognized` and classified as an error later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleStatus {
    Pass,
    Fail,
    Warn,
    Error,
    Skip,
    Unrecognized(String),
}

impl RuleStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Skip => "skip",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Bounded label for metrics; unrecognized engine statuses share one value
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Skip => "skip",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

impl From<&str> for RuleStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => Self::Pass,
            "fail" => Self::Fail,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "skip" => Self::Skip,
            _ => Self::Unrecognized(value.to_string()),
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One record per evaluated (resource, policy, rule) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub resource: ResourceIdentity,
    pub policy: String,
    pub rule: String,
    pub rule_kind: RuleKind,
    pub status: RuleStatus,
    #[serde(default)]
    pub message: String,
    /// Policy-level flags copied once per policy, not re-read per outcome
    pub traits: PolicyTraits,
}
