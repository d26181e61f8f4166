// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Apply Service
//!
//! End-to-end use cases over the pipeline: apply policy sources to explicit
//! resource queries, or scan a namespace with a curated policy bundle.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Compose loader → resolver → orchestrator (→ classifier)
//! - **Integration:** Called by the tool surface and the CLI
//!
//! Loader and resolver failures abort the request. Per-rule engine failures
//! never do; they come back as `error` rows.

use crate::application::classifier::ReportClassifier;
use crate::application::orchestrator::Orchestrator;
use crate::application::scan_planner::ScanPlanner;
use crate::domain::apply::{ApplyRequest, ApplyResponse, PolicyApplicationResult, RuleResult};
use crate::domain::cluster::{ClusterConnector, CredentialSource};
use crate::domain::config::{ReportConfig, ScannerConfigSpec};
use crate::domain::errors::ScanError;
use crate::domain::evaluator::RuleEvaluator;
use crate::domain::outcome::RuleOutcome;
use crate::domain::policy::PolicyDefinition;
use crate::domain::report::{ClassifyOptions, ReportView, ScanReport};
use crate::domain::resource::ResolvedResource;
use crate::infrastructure::bundles;
use crate::infrastructure::policy_loader::PolicyLoader;
use crate::infrastructure::resource_resolver::ResourceResolver;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Input of the curated-bundle scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Bundle key, unknown keys fall back to every bundle
    pub policy_sets: String,
    /// `all`, empty for the configured default, or a namespace name
    pub namespace: String,
    /// Recorded in the report envelope
    pub git_branch: String,
    pub excluded_namespaces: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_credential: Option<String>,
}

pub struct ApplyService {
    loader: PolicyLoader,
    resolver: ResourceResolver,
    orchestrator: Orchestrator,
    planner: ScanPlanner,
    report: ReportConfig,
}

impl ApplyService {
    pub fn new(
        connector: Arc<dyn ClusterConnector>,
        evaluator: Arc<dyn RuleEvaluator>,
        spec: &ScannerConfigSpec,
    ) -> Self {
        Self {
            loader: PolicyLoader::new().recursive(spec.policies.recursive),
            resolver: ResourceResolver::new(connector, spec.resolution.clone()),
            orchestrator: Orchestrator::new(evaluator, &spec.evaluation),
            planner: ScanPlanner::new(spec.resolution.default_namespace.clone()),
            report: spec.report.clone(),
        }
    }

    /// Apply every policy source to every resource the queries resolve to
    pub async fn apply(
        &self,
        request: &ApplyRequest,
        cancel: &CancellationToken,
    ) -> Result<ApplyResponse, ScanError> {
        request.validate()?;

        let policies = self.loader.load_all(&request.policy_sources)?;
        let credential = CredentialSource::from_override(request.target_credential.as_deref());
        let resources = self
            .resolver
            .resolve(&request.resource_queries, &credential, cancel)
            .await?;
        let outcomes = self.orchestrator.apply(&policies, &resources, cancel).await?;

        let results = group_outcomes(&policies, &resources, outcomes);
        info!(
            sources = request.policy_sources.len(),
            queries = request.resource_queries.len(),
            results = results.len(),
            "Apply request completed"
        );
        Ok(ApplyResponse { results, resources })
    }

    /// Scan with a curated bundle and return the violations view
    pub async fn scan(
        &self,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let policy_sets = bundles::select(&request.policy_sets);
        let scan_id = Uuid::new_v4();
        let span = info_span!("scan", %scan_id);

        async {
            info!(
                policy_sets,
                namespace = %request.namespace,
                git_branch = %request.git_branch,
                "Starting policy scan"
            );
            let result = self.run_scan(scan_id, policy_sets, request, cancel).await;
            if let Err(e) = &result {
                error!(policy_sets, error = %e, "Policy scan failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_scan(
        &self,
        scan_id: Uuid,
        policy_sets: &str,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let policies = self.loader.load(policy_sets)?;
        let queries = self.planner.plan(&policies, &request.namespace);
        let credential = CredentialSource::from_override(request.target_credential.as_deref());

        let resources = if queries.is_empty() {
            Vec::new()
        } else {
            self.resolver.resolve(&queries, &credential, cancel).await?
        };
        let outcomes = self.orchestrator.apply(&policies, &resources, cancel).await?;

        let classifier = ReportClassifier::new(ClassifyOptions {
            view: ReportView::Violations,
            audit_warn: self.report.audit_warn,
            excluded_namespaces: request.excluded_namespaces.clone(),
            source: self.report.source.clone(),
        });
        let classification = classifier.classify_at(&outcomes, Utc::now());

        info!(
            policies = policies.len(),
            resources = resources.len(),
            violations = classification.results.len(),
            "Policy scan completed"
        );
        Ok(ScanReport {
            scan_id,
            policy_sets: policy_sets.to_string(),
            namespace: request.namespace.clone(),
            git_branch: request.git_branch.clone(),
            policies: policies.len(),
            resources: resources.len(),
            generated_at: classification.timestamp,
            summary: classification.summary,
            results: classification.results,
        })
    }
}

/// One result per resource × policy, rules nested in declaration order.
/// Relies on the orchestrator's resource-major, policy, rule ordering.
fn group_outcomes(
    policies: &[PolicyDefinition],
    resources: &[ResolvedResource],
    outcomes: Vec<RuleOutcome>,
) -> Vec<PolicyApplicationResult> {
    let mut outcomes = outcomes.into_iter();
    let mut results = Vec::with_capacity(policies.len() * resources.len());

    for resource in resources {
        for policy in policies {
            let rules = outcomes
                .by_ref()
                .take(policy.rules.len())
                .map(|outcome| RuleResult {
                    name: outcome.rule,
                    kind: outcome.rule_kind,
                    message: outcome.message,
                    status: outcome.status,
                })
                .collect();
            results.push(PolicyApplicationResult {
                policy: policy.name.clone(),
                resource: resource.identity(),
                rules,
                validation_failure_action: policy.failure_action,
            });
        }
    }
    results
}
