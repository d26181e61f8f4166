// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Stored Policy Reports
//!
//! Discovery and listing of the `wgpolicyk8s.io` PolicyReport and
//! ClusterPolicyReport resources a policy engine writes into the cluster.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Read stored reports through the `ClusterApi` port
//! - **Integration:** `ClusterApi` → `StoredReport` → violations use case

use crate::domain::cluster::{ApiError, ClusterApi, ListOptions};
use crate::domain::resource::{ResolvedResource, ResourceIdentity, ResourceLocator};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

pub const POLICY_REPORT_GROUP: &str = "wgpolicyk8s.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Namespaced,
    Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredSummary {
    pub pass: u64,
    pub fail: u64,
    pub warn: u64,
    pub error: u64,
    pub skip: u64,
}

impl StoredSummary {
    pub fn has_failures(&self) -> bool {
        self.fail > 0 || self.error > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl From<ObjectReference> for ResourceIdentity {
    fn from(reference: ObjectReference) -> Self {
        Self {
            api_version: reference.api_version,
            kind: reference.kind,
            namespace: reference.namespace,
            name: reference.name,
            uid: reference.uid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoredResult {
    pub source: String,
    pub policy: String,
    pub rule: String,
    pub result: String,
    pub message: String,
    pub scored: bool,
    pub category: String,
    pub severity: String,
    pub resources: Vec<ObjectReference>,
    pub timestamp: Option<StoredTimestamp>,
}

impl Default for StoredResult {
    fn default() -> Self {
        Self {
            source: String::new(),
            policy: String::new(),
            rule: String::new(),
            result: String::new(),
            message: String::new(),
            scored: true,
            category: String::new(),
            severity: String::new(),
            resources: Vec::new(),
            timestamp: None,
        }
    }
}

impl StoredResult {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_ref()
            .and_then(|ts| Utc.timestamp_opt(ts.seconds, ts.nanos).single())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawReportMetadata {
    name: String,
    namespace: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawReport {
    metadata: RawReportMetadata,
    /// Single-resource reports name their subject here instead of per result
    scope: Option<ObjectReference>,
    summary: StoredSummary,
    results: Vec<StoredResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub scope: ReportScope,
    pub name: String,
    pub namespace: String,
    pub subject: Option<ObjectReference>,
    pub summary: StoredSummary,
    pub results: Vec<StoredResult>,
}

impl StoredReport {
    pub fn from_resource(scope: ReportScope, resource: &ResolvedResource) -> Result<Self, ApiError> {
        let raw = RawReport::deserialize(resource.document())
            .map_err(|e| ApiError::Decode(format!("policy report '{}': {}", resource.name(), e)))?;
        Ok(Self {
            scope,
            name: raw.metadata.name,
            namespace: raw.metadata.namespace,
            subject: raw.scope,
            summary: raw.summary,
            results: raw.results,
        })
    }
}

/// Preferred served version of the report group, `None` when it is not installed
pub async fn discover(api: &dyn ClusterApi) -> Result<Option<String>, ApiError> {
    let versions = api.api_group_versions(POLICY_REPORT_GROUP).await?;
    Ok(versions.into_iter().next())
}

pub fn locator(version: &str, scope: ReportScope) -> ResourceLocator {
    let resource = match scope {
        ReportScope::Namespaced => "policyreports",
        ReportScope::Cluster => "clusterpolicyreports",
    };
    ResourceLocator::new(POLICY_REPORT_GROUP, version, resource)
}

/// Namespaced reports of `namespace` followed by every cluster report.
/// A collection that fails to list is logged and contributes nothing.
pub async fn list_reports(api: &dyn ClusterApi, version: &str, namespace: &str) -> Vec<StoredReport> {
    let mut reports = Vec::new();
    for (scope, ns) in [
        (ReportScope::Namespaced, Some(namespace.to_string())),
        (ReportScope::Cluster, None),
    ] {
        let locator = locator(version, scope);
        let options = ListOptions {
            namespace: ns,
            ..Default::default()
        };
        match api.list(&locator, &options).await {
            Ok(items) => {
                debug!(collection = %locator, count = items.len(), "Listed policy reports");
                for item in &items {
                    match StoredReport::from_resource(scope, item) {
                        Ok(report) => reports.push(report),
                        Err(e) => warn!(error = %e, "Skipping unreadable policy report"),
                    }
                }
            }
            Err(e) => warn!(collection = %locator, error = %e, "Failed to list policy reports"),
        }
    }
    reports
}
