// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Report
//!
//! Caller-facing, classified results and the options that drive
//! classification.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Stable report-result shape shared by scans and stored
//!   policy reports

use crate::domain::resource::ResourceIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

pub const PLACEHOLDER_TEXT: &str = "No policies applied";
pub const DEFAULT_SOURCE: &str = "kyverno";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
    Warn,
    Error,
    Skip,
}

impl ReportStatus {
    /// Statuses kept by the violations view
    pub fn is_violation(self) -> bool {
        matches!(self, Self::Fail | Self::Error | Self::Warn)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Skip => "skip",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub source: String,
    pub policy: String,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceIdentity>,
    pub status: ReportStatus,
    #[serde(default)]
    pub message: String,
    pub scored: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
    /// Captured once per call and shared by every result of that call
    pub timestamp: DateTime<Utc>,
    /// When the policy engine wrote the result, for stored reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<DateTime<Utc>>,
}

impl ReportResult {
    /// Neutral row rendered when nothing is left to report
    pub fn placeholder(source: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            policy: PLACEHOLDER_TEXT.to_string(),
            rule: PLACEHOLDER_TEXT.to_string(),
            resource: None,
            status: ReportStatus::Skip,
            message: PLACEHOLDER_TEXT.to_string(),
            scored: false,
            category: String::new(),
            severity: String::new(),
            timestamp,
            reported_at: None,
        }
    }

    pub fn namespace(&self) -> &str {
        self.resource
            .as_ref()
            .map(|r| r.namespace.as_str())
            .unwrap_or_default()
    }
}

/// Which classified results leave the classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    /// fail, error and warn only
    #[default]
    Violations,
    /// Every classified result, pass and skip included
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub view: ReportView,
    /// Downgrade scored failures of audit-mode policies to warn
    pub audit_warn: bool,
    pub excluded_namespaces: BTreeSet<String>,
    pub source: String,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            view: ReportView::Violations,
            audit_warn: false,
            excluded_namespaces: BTreeSet::new(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl ClassifyOptions {
    pub fn is_excluded(&self, namespace: &str) -> bool {
        !namespace.is_empty() && self.excluded_namespaces.contains(namespace)
    }
}

/// Parse a comma-separated namespace list. Blanks are trimmed and dropped.
pub fn parse_namespace_excludes(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub pass: usize,
    pub fail: usize,
    pub warn: usize,
    pub error: usize,
    pub skip: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[ReportResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status);
        }
        summary
    }

    pub fn record(&mut self, status: ReportStatus) {
        match status {
            ReportStatus::Pass => self.pass += 1,
            ReportStatus::Fail => self.fail += 1,
            ReportStatus::Warn => self.warn += 1,
            ReportStatus::Error => self.error += 1,
            ReportStatus::Skip => self.skip += 1,
        }
    }

    pub fn violations(&self) -> usize {
        self.fail + self.error + self.warn
    }
}

/// Envelope returned by a curated-bundle scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Correlates the report with the scan's log lines
    pub scan_id: Uuid,
    pub policy_sets: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub git_branch: String,
    pub policies: usize,
    pub resources: usize,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub results: Vec<ReportResult>,
}
