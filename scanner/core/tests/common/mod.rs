// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-memory cluster shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kscan_core::domain::cluster::{ApiError, ClusterApi, ClusterConnector, CredentialSource, ListOptions};
use kscan_core::domain::errors::ScanError;
use kscan_core::domain::evaluator::{EvaluationContext, EvaluationError, RuleEvaluator, RuleVerdict};
use kscan_core::domain::resource::{ResolvedResource, ResourceLocator};
use kscan_core::infrastructure::PatternEvaluator;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Objects bucketed by plural resource name
#[derive(Default)]
pub struct InMemoryCluster {
    buckets: HashMap<String, Vec<Value>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: &str, document: Value) -> Self {
        self.buckets
            .entry(resource.to_string())
            .or_default()
            .push(document);
        self
    }

    pub fn connector(self) -> Arc<dyn ClusterConnector> {
        Arc::new(InMemoryConnector(Arc::new(self)))
    }

    fn bucket(&self, locator: &ResourceLocator) -> &[Value] {
        self.buckets
            .get(&locator.resource)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn field<'a>(document: &'a Value, key: &str) -> &'a str {
    document["metadata"][key].as_str().unwrap_or_default()
}

fn selector_matches(document: &Value, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    selector.split(',').all(|term| match term.split_once('=') {
        Some((key, value)) => document["metadata"]["labels"][key.trim()] == value.trim(),
        None => !document["metadata"]["labels"][term.trim()].is_null(),
    })
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn get(
        &self,
        locator: &ResourceLocator,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResolvedResource, ApiError> {
        self.bucket(locator)
            .iter()
            .find(|d| field(d, "name") == name && namespace.is_none_or(|ns| field(d, "namespace") == ns))
            .cloned()
            .map(ResolvedResource::new)
            .ok_or_else(|| ApiError::NotFound(name.to_string()))
    }

    async fn list(
        &self,
        locator: &ResourceLocator,
        options: &ListOptions,
    ) -> Result<Vec<ResolvedResource>, ApiError> {
        Ok(self
            .bucket(locator)
            .iter()
            .filter(|d| {
                options
                    .namespace
                    .as_deref()
                    .is_none_or(|ns| field(d, "namespace") == ns)
            })
            .filter(|d| selector_matches(d, options.label_selector.as_deref()))
            .cloned()
            .map(ResolvedResource::new)
            .collect())
    }

    async fn api_group_versions(&self, _group: &str) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }
}

struct InMemoryConnector(Arc<InMemoryCluster>);

#[async_trait]
impl ClusterConnector for InMemoryConnector {
    async fn connect(&self, _credential: &CredentialSource) -> Result<Arc<dyn ClusterApi>, ScanError> {
        Ok(self.0.clone())
    }
}

/// Pattern evaluator that counts its calls
#[derive(Default)]
pub struct CountingEvaluator {
    inner: PatternEvaluator,
    pub calls: AtomicUsize,
}

impl CountingEvaluator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleEvaluator for CountingEvaluator {
    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<RuleVerdict, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(ctx).await
    }
}

pub fn pod(namespace: &str, name: &str, labels: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{}", name),
            "labels": labels
        },
        "spec": {"containers": [{"name": "app", "image": "nginx:1.27"}]}
    })
}

/// A policy requiring the `app.kubernetes.io/name` label on pods
pub fn require_labels_policy(name: &str, action: &str) -> String {
    format!(
        r#"apiVersion: kyverno.io/v1
kind: ClusterPolicy
metadata:
  name: {name}
  annotations:
    policies.kyverno.io/category: Best Practices
    policies.kyverno.io/severity: medium
spec:
  validationFailureAction: {action}
  rules:
    - name: check-for-labels
      match:
        any:
          - resources:
              kinds:
                - Pod
      validate:
        message: "label 'app.kubernetes.io/name' is required"
        pattern:
          metadata:
            labels:
              app.kubernetes.io/name: "?*"
"#
    )
}
