// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Apply Envelope
//!
//! Request and response shapes for applying policy sources to resource
//! queries.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Boundary contract, validated before the pipeline runs

use crate::domain::errors::ScanError;
use crate::domain::outcome::RuleStatus;
use crate::domain::policy::{FailureAction, RuleKind};
use crate::domain::resource::{ResolvedResource, ResourceIdentity, ResourceQuery};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// File paths, directories or bundle keys
    #[serde(default)]
    pub policy_sources: Vec<String>,

    #[serde(default)]
    pub resource_queries: Vec<ResourceQuery>,

    /// Credential override for the target cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_credential: Option<String>,
}

impl ApplyRequest {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.policy_sources.is_empty() {
            return Err(ScanError::InvalidRequest(
                "policySources must contain at least one policy source".to_string(),
            ));
        }
        if let Some(index) = self
            .policy_sources
            .iter()
            .position(|source| source.trim().is_empty())
        {
            return Err(ScanError::InvalidRequest(format!(
                "policySources[{}] is empty",
                index
            )));
        }
        if self.resource_queries.is_empty() {
            return Err(ScanError::InvalidRequest(
                "resourceQueries must contain at least one resource query".to_string(),
            ));
        }
        for (index, query) in self.resource_queries.iter().enumerate() {
            query.validate().map_err(|reason| {
                ScanError::InvalidRequest(format!("resourceQueries[{}]: {}", index, reason))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default)]
    pub message: String,
    pub status: RuleStatus,
}

/// Every rule of one policy applied to one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyApplicationResult {
    pub policy: String,
    pub resource: ResourceIdentity,
    pub rules: Vec<RuleResult>,
    pub validation_failure_action: FailureAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub results: Vec<PolicyApplicationResult>,
    pub resources: Vec<ResolvedResource>,
}
