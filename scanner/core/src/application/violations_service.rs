// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Violations Service
//!
//! Reads the policy reports a policy engine already stored in the cluster
//! and returns their violations.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Show-violations use case over stored PolicyReports
//! - **Integration:** `ClusterConnector` → `policy_reports` → `ReportResult`
//!
//! A cluster without the report API group yields
//! `ScanError::CapabilityMissing`, which the tool surface turns into install
//! guidance rather than an error.

use crate::application::classifier::classify_status;
use crate::domain::cluster::{ClusterConnector, CredentialSource};
use crate::domain::config::ScannerConfigSpec;
use crate::domain::errors::ScanError;
use crate::domain::outcome::RuleStatus;
use crate::domain::policy::FailureAction;
use crate::domain::report::ReportResult;
use crate::domain::resource::ResourceIdentity;
use crate::infrastructure::policy_reports::{self, StoredReport, POLICY_REPORT_GROUP};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ViolationsService {
    connector: Arc<dyn ClusterConnector>,
    default_namespace: String,
    source: String,
}

impl ViolationsService {
    pub fn new(connector: Arc<dyn ClusterConnector>, spec: &ScannerConfigSpec) -> Self {
        Self {
            connector,
            default_namespace: spec.resolution.default_namespace.clone(),
            source: spec.report.source.clone(),
        }
    }

    pub async fn show(
        &self,
        namespace: &str,
        excluded_namespaces: &BTreeSet<String>,
        credential: &CredentialSource,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReportResult>, ScanError> {
        let namespace = match namespace.trim() {
            "" => self.default_namespace.as_str(),
            ns => ns,
        };

        let lookup = async {
            let api = self.connector.connect(credential).await?;
            let version = policy_reports::discover(api.as_ref())
                .await
                .map_err(|e| ScanError::transport(format!("discovering {}", POLICY_REPORT_GROUP), e.to_string()))?
                .ok_or_else(|| {
                    ScanError::CapabilityMissing(format!(
                        "the {} API group (PolicyReport) is not served by the target cluster",
                        POLICY_REPORT_GROUP
                    ))
                })?;
            debug!(version = %version, "Discovered policy report API");
            Ok::<_, ScanError>(policy_reports::list_reports(api.as_ref(), &version, namespace).await)
        };

        let reports = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled("policy report listing".to_string())),
            reports = lookup => reports?,
        };

        let timestamp = Utc::now();
        let mut results = Vec::new();
        for report in &reports {
            if is_excluded(excluded_namespaces, &report.namespace) {
                debug!(report = %report.name, namespace = %report.namespace, "Skipping report in excluded namespace");
                continue;
            }
            if !report.summary.has_failures() {
                debug!(report = %report.name, "Skipping report without failures");
                continue;
            }
            self.collect(report, excluded_namespaces, timestamp, &mut results);
        }

        info!(
            namespace,
            reports = reports.len(),
            violations = results.len(),
            "Collected policy report violations"
        );
        Ok(results)
    }

    fn collect(
        &self,
        report: &StoredReport,
        excluded_namespaces: &BTreeSet<String>,
        timestamp: DateTime<Utc>,
        results: &mut Vec<ReportResult>,
    ) {
        for stored in &report.results {
            let status = classify_status(
                &RuleStatus::from(stored.result.as_str()),
                stored.scored,
                FailureAction::Enforce,
                false,
            );
            if !status.is_violation() {
                continue;
            }

            let resource: Option<ResourceIdentity> = stored
                .resources
                .first()
                .or(report.subject.as_ref())
                .cloned()
                .map(Into::into);
            if resource
                .as_ref()
                .is_some_and(|r| is_excluded(excluded_namespaces, &r.namespace))
            {
                continue;
            }

            metrics::counter!("kscan_report_results_total", "status" => status.to_string()).increment(1);
            results.push(ReportResult {
                source: if stored.source.is_empty() {
                    self.source.clone()
                } else {
                    stored.source.clone()
                },
                policy: stored.policy.clone(),
                rule: stored.rule.clone(),
                resource,
                status,
                message: stored.message.clone(),
                scored: stored.scored,
                category: stored.category.clone(),
                severity: stored.severity.clone(),
                timestamp,
                reported_at: stored.timestamp(),
            });
        }
    }
}

fn is_excluded(excluded: &BTreeSet<String>, namespace: &str) -> bool {
    !namespace.is_empty() && excluded.contains(namespace)
}
