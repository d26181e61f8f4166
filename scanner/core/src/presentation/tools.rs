// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Assistant Tool Surface
//!
//! Tool catalog exposed to a calling agent, argument binding and result
//! rendering.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Bind tool arguments to use cases, render `{text, isError}`
//! - **Integration:** HTTP API / CLI → `ToolCatalog` → application services
//!
//! A tool call never fails at the transport level: every failure is
//! rendered as an `isError` result. An empty violation set renders one
//! neutral placeholder row, and a cluster without policy reports gets
//! installation guidance instead of an error.

use crate::application::apply_service::{ApplyService, ScanRequest};
use crate::application::violations_service::ViolationsService;
use crate::domain::apply::ApplyRequest;
use crate::domain::cluster::CredentialSource;
use crate::domain::errors::ScanError;
use crate::domain::report::{parse_namespace_excludes, ReportResult, DEFAULT_SOURCE};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const TOOL_APPLY_POLICIES: &str = "apply_policies";
pub const TOOL_SHOW_VIOLATIONS: &str = "show_violations";
pub const TOOL_APPLY_POLICY_REQUEST: &str = "apply_policy_request";

pub const DEFAULT_NAMESPACE_EXCLUDE: &str = "kube-system,kyverno";

pub const INSTALL_GUIDANCE: &str = "\
Kyverno does not appear to be installed in this cluster: the PolicyReport API \
(wgpolicyk8s.io) is not available, so there are no stored violations to show.

Install Kyverno with Helm:

  helm repo add kyverno https://kyverno.github.io/kyverno/
  helm repo update
  helm install kyverno kyverno/kyverno --namespace kyverno --create-namespace

Optionally install the default policy set:

  helm install kyverno-policies kyverno/kyverno-policies --namespace kyverno

Once Kyverno has produced policy reports, run show_violations again, or use \
apply_policies to scan the cluster directly without Kyverno.";

/// Tool metadata for discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Error: failed to render result: {}", e)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApplyPoliciesArgs {
    #[serde(rename = "policySets", default = "default_policy_sets")]
    policy_sets: String,
    #[serde(default)]
    namespace: String,
    #[serde(rename = "gitBranch", default = "default_git_branch")]
    git_branch: String,
    #[serde(default = "default_namespace_exclude")]
    namespace_exclude: String,
}

#[derive(Debug, Deserialize)]
struct ShowViolationsArgs {
    #[serde(default = "default_namespace")]
    namespace: String,
    #[serde(default = "default_namespace_exclude")]
    namespace_exclude: String,
}

fn default_policy_sets() -> String {
    "all".to_string()
}

fn default_git_branch() -> String {
    "main".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_namespace_exclude() -> String {
    DEFAULT_NAMESPACE_EXCLUDE.to_string()
}

pub struct ToolCatalog {
    apply: Arc<ApplyService>,
    violations: Arc<ViolationsService>,
    target_credential: Option<String>,
    source: String,
}

impl ToolCatalog {
    pub fn new(apply: Arc<ApplyService>, violations: Arc<ViolationsService>) -> Self {
        Self {
            apply,
            violations,
            target_credential: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Credential used by tools whose arguments carry none
    pub fn with_target_credential(mut self, credential: Option<String>) -> Self {
        self.target_credential = credential;
        self
    }

    /// Source label of the placeholder row
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn list(&self) -> Vec<ToolMetadata> {
        vec![
            ToolMetadata {
                name: TOOL_APPLY_POLICIES,
                description: "Scan cluster resources with a curated policy set and report violations",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "policySets": {
                            "type": "string",
                            "description": "Policy set to apply: all, pod-security, rbac-best-practices or kubernetes-best-practices",
                            "default": "all"
                        },
                        "namespace": {
                            "type": "string",
                            "description": "Namespace to scan, 'all' for every namespace, empty for the default namespace",
                            "default": ""
                        },
                        "gitBranch": {
                            "type": "string",
                            "description": "Branch the scanned manifests came from",
                            "default": "main"
                        },
                        "namespace_exclude": {
                            "type": "string",
                            "description": "Comma-separated namespaces to leave out of the report",
                            "default": DEFAULT_NAMESPACE_EXCLUDE
                        }
                    }
                }),
            },
            ToolMetadata {
                name: TOOL_SHOW_VIOLATIONS,
                description: "Show violations from the policy reports stored in the cluster",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "namespace": {
                            "type": "string",
                            "description": "Namespace whose policy reports are read",
                            "default": "default"
                        },
                        "namespace_exclude": {
                            "type": "string",
                            "description": "Comma-separated namespaces to leave out of the report",
                            "default": DEFAULT_NAMESPACE_EXCLUDE
                        }
                    }
                }),
            },
            ToolMetadata {
                name: TOOL_APPLY_POLICY_REQUEST,
                description: "Apply policy files, directories or bundles to explicit resource queries",
                input_schema: json!({
                    "type": "object",
                    "required": ["policySources", "resourceQueries"],
                    "properties": {
                        "policySources": {
                            "type": "array",
                            "items": {"type": "string"},
                            "minItems": 1,
                            "description": "Policy file paths, directories or bundle keys"
                        },
                        "resourceQueries": {
                            "type": "array",
                            "minItems": 1,
                            "items": {
                                "type": "object",
                                "required": ["apiVersion", "kind"],
                                "properties": {
                                    "apiVersion": {"type": "string"},
                                    "kind": {"type": "string"},
                                    "namespace": {"type": "string"},
                                    "name": {"type": "string"},
                                    "labelSelector": {"type": "string"},
                                    "fieldSelector": {"type": "string"}
                                }
                            }
                        },
                        "targetCredential": {
                            "type": "string",
                            "description": "Kubeconfig path overriding the default credentials"
                        }
                    }
                }),
            },
        ]
    }

    pub async fn call(&self, call: ToolCall, cancel: &CancellationToken) -> ToolResult {
        info!(tool = %call.name, "Tool call");
        let arguments = if call.arguments.is_null() {
            json!({})
        } else {
            call.arguments
        };

        match call.name.as_str() {
            TOOL_APPLY_POLICIES => match bind::<ApplyPoliciesArgs>(&call.name, arguments) {
                Ok(args) => self.apply_policies(args, cancel).await,
                Err(result) => result,
            },
            TOOL_SHOW_VIOLATIONS => match bind::<ShowViolationsArgs>(&call.name, arguments) {
                Ok(args) => self.show_violations(args, cancel).await,
                Err(result) => result,
            },
            TOOL_APPLY_POLICY_REQUEST => match bind::<ApplyRequest>(&call.name, arguments) {
                Ok(request) => self.apply_policy_request(request, cancel).await,
                Err(result) => result,
            },
            other => ToolResult::error(format!("Error: unknown tool '{}'", other)),
        }
    }

    async fn apply_policies(&self, args: ApplyPoliciesArgs, cancel: &CancellationToken) -> ToolResult {
        let request = ScanRequest {
            policy_sets: args.policy_sets,
            namespace: args.namespace,
            git_branch: args.git_branch,
            excluded_namespaces: parse_namespace_excludes(&args.namespace_exclude),
            target_credential: self.target_credential.clone(),
        };
        match self.apply.scan(&request, cancel).await {
            Ok(mut report) => {
                if report.results.is_empty() {
                    report.results = vec![ReportResult::placeholder(&self.source, report.generated_at)];
                }
                ToolResult::json(&report)
            }
            Err(e) => failure(TOOL_APPLY_POLICIES, e),
        }
    }

    async fn show_violations(&self, args: ShowViolationsArgs, cancel: &CancellationToken) -> ToolResult {
        let excluded = parse_namespace_excludes(&args.namespace_exclude);
        let credential = CredentialSource::from_override(self.target_credential.as_deref());
        match self
            .violations
            .show(&args.namespace, &excluded, &credential, cancel)
            .await
        {
            Ok(results) if results.is_empty() => {
                ToolResult::json(&vec![ReportResult::placeholder(&self.source, Utc::now())])
            }
            Ok(results) => ToolResult::json(&results),
            Err(e) if e.is_capability_missing() => {
                warn!(error = %e, "Policy reports unavailable, returning install guidance");
                ToolResult::text(INSTALL_GUIDANCE)
            }
            Err(e) => failure(TOOL_SHOW_VIOLATIONS, e),
        }
    }

    async fn apply_policy_request(&self, mut request: ApplyRequest, cancel: &CancellationToken) -> ToolResult {
        if request.target_credential.is_none() {
            request.target_credential = self.target_credential.clone();
        }
        match self.apply.apply(&request, cancel).await {
            Ok(response) => ToolResult::json(&response),
            Err(e) => failure(TOOL_APPLY_POLICY_REQUEST, e),
        }
    }
}

fn bind<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolResult> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolResult::error(format!("Error: invalid arguments for {}: {}", tool, e)))
}

fn failure(tool: &str, err: ScanError) -> ToolResult {
    warn!(tool, error = %err, "Tool call failed");
    ToolResult::error(format!("Error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cluster::{ApiError, ClusterApi, ClusterConnector, ListOptions};
    use crate::domain::config::ScannerConfigSpec;
    use crate::domain::evaluator::{EvaluationContext, EvaluationError, RuleEvaluator, RuleVerdict};
    use crate::domain::resource::{ResolvedResource, ResourceLocator};
    use async_trait::async_trait;

    struct EmptyCluster;

    #[async_trait]
    impl ClusterApi for EmptyCluster {
        async fn get(
            &self,
            _locator: &ResourceLocator,
            _namespace: Option<&str>,
            name: &str,
        ) -> Result<ResolvedResource, ApiError> {
            Err(ApiError::NotFound(name.to_string()))
        }

        async fn list(
            &self,
            _locator: &ResourceLocator,
            _options: &ListOptions,
        ) -> Result<Vec<ResolvedResource>, ApiError> {
            Ok(Vec::new())
        }

        async fn api_group_versions(&self, _group: &str) -> Result<Vec<String>, ApiError> {
            Ok(Vec::new())
        }
    }

    struct EmptyConnector;

    #[async_trait]
    impl ClusterConnector for EmptyConnector {
        async fn connect(
            &self,
            _credential: &CredentialSource,
        ) -> Result<Arc<dyn ClusterApi>, ScanError> {
            Ok(Arc::new(EmptyCluster))
        }
    }

    struct Passing;

    #[async_trait]
    impl RuleEvaluator for Passing {
        async fn evaluate(&self, _ctx: EvaluationContext<'_>) -> Result<RuleVerdict, EvaluationError> {
            Ok(RuleVerdict::pass("ok"))
        }
    }

    fn catalog() -> ToolCatalog {
        let spec = ScannerConfigSpec::default();
        let connector: Arc<dyn ClusterConnector> = Arc::new(EmptyConnector);
        ToolCatalog::new(
            Arc::new(ApplyService::new(connector.clone(), Arc::new(Passing), &spec)),
            Arc::new(ViolationsService::new(connector, &spec)),
        )
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn test_catalog_lists_three_tools_with_schemas() {
        let tools = catalog().list();
        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![TOOL_APPLY_POLICIES, TOOL_SHOW_VIOLATIONS, TOOL_APPLY_POLICY_REQUEST]
        );
        assert!(tools.iter().all(|t| t.input_schema["type"] == "object"));
    }

    #[tokio::test]
    async fn test_empty_scan_renders_placeholder() {
        let result = catalog()
            .call(call(TOOL_APPLY_POLICIES, Value::Null), &CancellationToken::new())
            .await;
        assert!(!result.is_error);
        let report: Value = serde_json::from_str(&result.text).unwrap();
        assert_eq!(report["policySets"], "all");
        assert_eq!(report["gitBranch"], "main");
        assert_eq!(report["results"][0]["policy"], "No policies applied");
        assert_eq!(report["results"][0]["status"], "skip");
    }

    #[tokio::test]
    async fn test_missing_capability_renders_guidance() {
        let result = catalog()
            .call(call(TOOL_SHOW_VIOLATIONS, json!({})), &CancellationToken::new())
            .await;
        assert!(!result.is_error);
        assert!(result.text.contains("helm install kyverno kyverno/kyverno"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_error_result() {
        let result = catalog()
            .call(
                call(TOOL_APPLY_POLICY_REQUEST, json!({"policySources": [], "resourceQueries": []})),
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("policySources"));
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool() {
        let catalog = catalog();
        let bad = catalog
            .call(call(TOOL_APPLY_POLICIES, json!({"policySets": 7})), &CancellationToken::new())
            .await;
        assert!(bad.is_error);
        assert!(bad.text.contains("invalid arguments"));

        let unknown = catalog
            .call(call("delete_cluster", json!({})), &CancellationToken::new())
            .await;
        assert!(unknown.is_error);
    }

    #[tokio::test]
    async fn test_named_resource_missing_is_error_result() {
        let result = catalog()
            .call(
                call(
                    TOOL_APPLY_POLICY_REQUEST,
                    json!({
                        "policySources": ["pod-security"],
                        "resourceQueries": [{"apiVersion": "v1", "kind": "Pod", "namespace": "default", "name": "ghost"}]
                    }),
                ),
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("ghost"));
    }
}
