// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Report Classifier
//!
//! Normalises raw rule outcomes into caller-facing report results.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Status decision table, namespace exclusion, view filtering
//! - **Integration:** `RuleOutcome` → `ReportResult` + `ReportSummary`
//!
//! | outcome  | scored | audit_warn and audit action | result |
//! |----------|--------|-----------------------------|--------|
//! | pass     |        |                             | pass   |
//! | skip     |        |                             | skip   |
//! | error    |        |                             | error  |
//! | fail     | false  |                             | warn   |
//! | fail     | true   | true                        | warn   |
//! | fail     | true   | false                       | fail   |
//! | warn     |        |                             | warn   |
//! | other    |        |                             | error  |

use crate::domain::outcome::{RuleOutcome, RuleStatus};
use crate::domain::policy::FailureAction;
use crate::domain::report::{ClassifyOptions, ReportResult, ReportStatus, ReportSummary, ReportView};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Classified results plus counts over every non-excluded outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub results: Vec<ReportResult>,
    pub summary: ReportSummary,
    pub timestamp: DateTime<Utc>,
}

/// Apply the decision table to one status
pub fn classify_status(
    status: &RuleStatus,
    scored: bool,
    failure_action: FailureAction,
    audit_warn: bool,
) -> ReportStatus {
    match status {
        RuleStatus::Pass => ReportStatus::Pass,
        RuleStatus::Skip => ReportStatus::Skip,
        RuleStatus::Error => ReportStatus::Error,
        RuleStatus::Warn => ReportStatus::Warn,
        RuleStatus::Fail if !scored => ReportStatus::Warn,
        RuleStatus::Fail if audit_warn && failure_action.is_audit() => ReportStatus::Warn,
        RuleStatus::Fail => ReportStatus::Fail,
        RuleStatus::Unrecognized(raw) => {
            warn!(status = %raw, "Unrecognized rule status, classifying as error");
            ReportStatus::Error
        }
    }
}

pub struct ReportClassifier {
    options: ClassifyOptions,
}

impl ReportClassifier {
    pub fn new(options: ClassifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ClassifyOptions {
        &self.options
    }

    pub fn classify(&self, outcomes: &[RuleOutcome]) -> Vec<ReportResult> {
        self.classify_at(outcomes, Utc::now()).results
    }

    pub fn classify_with_summary(&self, outcomes: &[RuleOutcome]) -> Classification {
        self.classify_at(outcomes, Utc::now())
    }

    /// Every result of one call shares `timestamp`
    pub fn classify_at(&self, outcomes: &[RuleOutcome], timestamp: DateTime<Utc>) -> Classification {
        let mut summary = ReportSummary::default();
        let mut results = Vec::new();
        let mut excluded = 0usize;

        for outcome in outcomes {
            if self.options.is_excluded(&outcome.resource.namespace) {
                excluded += 1;
                continue;
            }

            let status = classify_status(
                &outcome.status,
                outcome.traits.scored,
                outcome.traits.failure_action,
                self.options.audit_warn,
            );
            summary.record(status);

            if self.options.view == ReportView::Violations && !status.is_violation() {
                continue;
            }

            metrics::counter!("kscan_report_results_total", "status" => status.to_string()).increment(1);
            results.push(ReportResult {
                source: self.options.source.clone(),
                policy: outcome.policy.clone(),
                rule: outcome.rule.clone(),
                resource: Some(outcome.resource.clone()),
                status,
                message: outcome.message.clone(),
                scored: outcome.traits.scored,
                category: outcome.traits.category.clone(),
                severity: outcome.traits.severity.clone(),
                timestamp,
                reported_at: None,
            });
        }

        debug!(
            outcomes = outcomes.len(),
            excluded,
            emitted = results.len(),
            "Classified rule outcomes"
        );
        Classification {
            results,
            summary,
            timestamp,
        }
    }
}
