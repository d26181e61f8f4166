// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Orchestrator
//!
//! Evaluates every rule of every policy against every resource and records
//! exactly one outcome per (resource, policy, rule) triple.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Drive the external rule engine over resources × policies
//! - **Integration:** `PolicyDefinition` + `ResolvedResource` → `RuleEvaluator` → `RuleOutcome`
//!
//! Rule kinds and policy traits are computed once per call, not per
//! resource. Work units are (resource, policy) pairs run with bounded
//! concurrency through an ordered stream, so outcomes come back
//! resource-major, then policy, then rule, whatever the concurrency.
//! An engine failure becomes an `error` outcome for that triple and the
//! traversal continues. Cancellation discards everything collected so far.

use crate::domain::config::EvaluationConfig;
use crate::domain::errors::ScanError;
use crate::domain::evaluator::{EvaluationContext, RuleEvaluator, RuleVerdict};
use crate::domain::outcome::{RuleOutcome, RuleStatus};
use crate::domain::policy::{PolicyDefinition, PolicyRule, PolicyTraits, RuleKind};
use crate::domain::resource::ResolvedResource;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A policy with per-call derived data
struct PreparedPolicy<'a> {
    policy: &'a PolicyDefinition,
    traits: PolicyTraits,
    rules: Vec<(&'a PolicyRule, RuleKind)>,
}

impl<'a> PreparedPolicy<'a> {
    fn new(policy: &'a PolicyDefinition) -> Self {
        Self {
            policy,
            traits: policy.traits(),
            rules: policy.rules.iter().map(|rule| (rule, rule.kind())).collect(),
        }
    }
}

pub struct Orchestrator {
    evaluator: Arc<dyn RuleEvaluator>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(evaluator: Arc<dyn RuleEvaluator>, config: &EvaluationConfig) -> Self {
        Self {
            evaluator,
            concurrency: config.concurrency.max(1),
        }
    }

    pub async fn apply(
        &self,
        policies: &[PolicyDefinition],
        resources: &[ResolvedResource],
        cancel: &CancellationToken,
    ) -> Result<Vec<RuleOutcome>, ScanError> {
        if policies.is_empty() || resources.is_empty() {
            debug!(
                policies = policies.len(),
                resources = resources.len(),
                "Nothing to evaluate"
            );
            return Ok(Vec::new());
        }

        let prepared: Vec<PreparedPolicy<'_>> = policies.iter().map(PreparedPolicy::new).collect();

        let units: Vec<_> = resources
            .iter()
            .flat_map(|resource| {
                prepared
                    .iter()
                    .map(move |policy| self.evaluate_pair(policy, resource))
            })
            .collect();
        let traversal = stream::iter(units).buffered(self.concurrency).concat();

        let outcomes: Vec<RuleOutcome> = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Rule evaluation cancelled, discarding partial outcomes");
                return Err(ScanError::Cancelled("rule evaluation".to_string()));
            }
            outcomes = traversal => outcomes,
        };

        for outcome in &outcomes {
            metrics::counter!("kscan_rule_outcomes_total", "status" => outcome.status.metric_label())
                .increment(1);
        }
        info!(
            policies = policies.len(),
            resources = resources.len(),
            outcomes = outcomes.len(),
            "Applied policies"
        );
        Ok(outcomes)
    }

    async fn evaluate_pair(
        &self,
        prepared: &PreparedPolicy<'_>,
        resource: &ResolvedResource,
    ) -> Vec<RuleOutcome> {
        let identity = resource.identity();
        let mut outcomes = Vec::with_capacity(prepared.rules.len());

        for &(rule, rule_kind) in &prepared.rules {
            let ctx = EvaluationContext {
                policy: prepared.policy,
                rule,
                rule_kind,
                resource,
            };
            let verdict = match self.evaluator.evaluate(ctx).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    let err = ScanError::Evaluation {
                        policy: prepared.policy.name.clone(),
                        rule: rule.name.clone(),
                        message: e.to_string(),
                    };
                    warn!(
                        policy = %prepared.policy.name,
                        rule = %rule.name,
                        resource = %identity.name,
                        error = %e,
                        "Rule evaluation failed, recording error outcome"
                    );
                    RuleVerdict::new(RuleStatus::Error, err.to_string())
                }
            };
            debug!(
                policy = %prepared.policy.name,
                rule = %rule.name,
                resource = %identity.name,
                status = %verdict.status,
                "Evaluated rule"
            );
            outcomes.push(RuleOutcome {
                resource: identity.clone(),
                policy: prepared.policy.name.clone(),
                rule: rule.name.clone(),
                rule_kind,
                status: verdict.status,
                message: verdict.message,
                traits: prepared.traits.clone(),
            });
        }
        outcomes
    }
}
