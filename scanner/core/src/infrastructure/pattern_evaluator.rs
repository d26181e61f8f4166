// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in Pattern Engine Adapter
//!
//! RuleEvaluator for the overlay-pattern subset of policy rules: match /
//! exclude blocks plus validate.pattern and validate.anyPattern. Expression
//! based validations (deny conditions, CEL) are reported as unsupported so the
//! orchestrator records them as `error` outcomes instead of guessing.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Default `RuleEvaluator` implementation

use crate::domain::evaluator::{EvaluationContext, EvaluationError, RuleEvaluator, RuleVerdict};
use crate::domain::policy::{MatchCriteria, ResourceDescription, RuleKind};
use crate::domain::resource::ResolvedResource;
use async_trait::async_trait;
use serde_json::{Map, Value};

const UNSUPPORTED_VALIDATIONS: &[&str] = &["deny", "cel", "podSecurity", "foreach", "manifests"];

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEvaluator;

impl PatternEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RuleEvaluator for PatternEvaluator {
    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<RuleVerdict, EvaluationError> {
        let rule = ctx.rule;

        if rule.match_criteria.is_empty() {
            return Ok(RuleVerdict::skip("rule has no match criteria"));
        }
        if !criteria_matches(&rule.match_criteria, ctx.resource) {
            return Ok(RuleVerdict::skip("rule does not match resource"));
        }
        if let Some(exclude) = rule.exclude.as_ref().filter(|e| !e.is_empty()) {
            if criteria_matches(exclude, ctx.resource) {
                return Ok(RuleVerdict::skip("resource is excluded by rule"));
            }
        }

        match ctx.rule_kind {
            RuleKind::Mutate => Ok(RuleVerdict::skip("mutate rules are not applied during scans")),
            RuleKind::Generate => Ok(RuleVerdict::skip(
                "generate rules are not applied during scans",
            )),
            RuleKind::Validate => validate(&rule.name, rule.validate.as_ref(), ctx.resource),
        }
    }
}

fn validate(
    rule_name: &str,
    block: Option<&Value>,
    resource: &ResolvedResource,
) -> Result<RuleVerdict, EvaluationError> {
    let block = block
        .and_then(Value::as_object)
        .ok_or_else(|| EvaluationError::Malformed(format!("rule '{}' has no validate block", rule_name)))?;
    let message = block
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if let Some(pattern) = block.get("pattern") {
        return Ok(match check(resource.document(), pattern) {
            Ok(()) => RuleVerdict::pass(format!("validation rule '{}' passed.", rule_name)),
            Err(path) => RuleVerdict::fail(format!(
                "validation error: {}. rule {} failed at path {}",
                message, rule_name, path
            )),
        });
    }

    if let Some(any_pattern) = block.get("anyPattern") {
        let patterns = any_pattern.as_array().ok_or_else(|| {
            EvaluationError::Malformed(format!("rule '{}': anyPattern must be a list", rule_name))
        })?;
        let mut failures = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            match check(resource.document(), pattern) {
                Ok(()) => {
                    return Ok(RuleVerdict::pass(format!(
                        "validation rule '{}' anyPattern[{}] passed.",
                        rule_name, index
                    )))
                }
                Err(path) => failures.push(format!("anyPattern[{}] failed at path {}", index, path)),
            }
        }
        return Ok(RuleVerdict::fail(format!(
            "validation error: {}. rule {} failed: {}",
            message,
            rule_name,
            failures.join("; ")
        )));
    }

    if let Some(key) = UNSUPPORTED_VALIDATIONS.iter().find(|key| block.contains_key(**key)) {
        return Err(EvaluationError::Unsupported(format!(
            "rule '{}' uses validate.{}, which the pattern engine does not evaluate",
            rule_name, key
        )));
    }

    Err(EvaluationError::Malformed(format!(
        "rule '{}': validate block has neither pattern nor anyPattern",
        rule_name
    )))
}

// ============================================================================
// Match / exclude
// ============================================================================

fn criteria_matches(criteria: &MatchCriteria, resource: &ResolvedResource) -> bool {
    let direct = criteria
        .resources
        .as_ref()
        .filter(|d| !d.is_empty())
        .map_or(true, |d| description_matches(d, resource));
    let any = criteria.any.is_empty()
        || criteria
            .any
            .iter()
            .any(|f| description_matches(&f.resources, resource));
    let all = criteria
        .all
        .iter()
        .all(|f| description_matches(&f.resources, resource));
    direct && any && all
}

fn description_matches(description: &ResourceDescription, resource: &ResolvedResource) -> bool {
    if !description.kinds.is_empty()
        && !description
            .kinds
            .iter()
            .any(|kind| kind_matches(kind, resource))
    {
        return false;
    }

    let names: Vec<&str> = description
        .name
        .iter()
        .chain(description.names.iter())
        .map(String::as_str)
        .collect();
    if !names.is_empty() && !names.iter().any(|n| wildcard_match(n, resource.name())) {
        return false;
    }

    if !description.namespaces.is_empty()
        && !description
            .namespaces
            .iter()
            .any(|ns| wildcard_match(ns, resource.namespace()))
    {
        return false;
    }

    if let Some(selector) = &description.selector {
        let labels = resource.labels();
        let selected = selector.match_labels.iter().all(|(key, expected)| {
            labels
                .get(key)
                .map_or(false, |actual| wildcard_match(expected, actual))
        });
        if !selected {
            return false;
        }
    }

    true
}

/// `Kind`, `version/Kind` or `group/version/Kind`, each part may use wildcards
fn kind_matches(kind_ref: &str, resource: &ResolvedResource) -> bool {
    match kind_ref.rsplit_once('/') {
        Some((api_version, kind)) => {
            wildcard_match(api_version, resource.api_version()) && wildcard_match(kind, resource.kind())
        }
        None => wildcard_match(kind_ref, resource.kind()),
    }
}

// ============================================================================
// Overlay patterns
// ============================================================================

enum PatternKey<'a> {
    Plain(&'a str),
    /// `=(key)`: checked only when the key is present
    Optional(&'a str),
    /// `X(key)`: the key must be absent
    Absent(&'a str),
}

fn parse_key(key: &str) -> PatternKey<'_> {
    if let Some(inner) = key.strip_prefix("=(").and_then(|k| k.strip_suffix(')')) {
        PatternKey::Optional(inner)
    } else if let Some(inner) = key.strip_prefix("X(").and_then(|k| k.strip_suffix(')')) {
        PatternKey::Absent(inner)
    } else {
        PatternKey::Plain(key)
    }
}

/// Ok, or the path of the first mismatch
fn check(resource: &Value, pattern: &Value) -> Result<(), String> {
    check_at(resource, pattern, "/")
}

fn check_at(resource: &Value, pattern: &Value, path: &str) -> Result<(), String> {
    match pattern {
        Value::Object(fields) => match resource {
            Value::Object(object) => check_object(object, fields, path),
            _ => Err(path.to_string()),
        },
        Value::Array(elements) => match (resource, elements.first()) {
            (_, None) => Ok(()),
            (Value::Array(items), Some(element)) => {
                for (index, item) in items.iter().enumerate() {
                    check_at(item, element, &format!("{}{}/", path, index))?;
                }
                Ok(())
            }
            _ => Err(path.to_string()),
        },
        scalar => {
            if scalar_matches(resource, scalar) {
                Ok(())
            } else {
                Err(path.to_string())
            }
        }
    }
}

fn check_object(
    object: &Map<String, Value>,
    fields: &Map<String, Value>,
    path: &str,
) -> Result<(), String> {
    for (raw_key, expected) in fields {
        match parse_key(raw_key) {
            PatternKey::Optional(key) => {
                if let Some(actual) = object.get(key) {
                    check_at(actual, expected, &format!("{}{}/", path, key))?;
                }
            }
            PatternKey::Absent(key) => {
                if object.contains_key(key) {
                    return Err(format!("{}{}/", path, key));
                }
            }
            PatternKey::Plain(key) => {
                let child = format!("{}{}/", path, key);
                match object.get(key) {
                    Some(actual) => check_at(actual, expected, &child)?,
                    None if expected.is_null() => {}
                    None => return Err(child),
                }
            }
        }
    }
    Ok(())
}

fn scalar_matches(resource: &Value, pattern: &Value) -> bool {
    match pattern {
        Value::Null => resource.is_null(),
        Value::Bool(expected) => match resource {
            Value::Bool(actual) => actual == expected,
            Value::String(actual) => actual.eq_ignore_ascii_case(&expected.to_string()),
            _ => false,
        },
        Value::Number(expected) => match (expected.as_f64(), numeric(resource)) {
            (Some(expected), Some(actual)) => (expected - actual).abs() < f64::EPSILON,
            _ => false,
        },
        Value::String(expression) => match resource {
            Value::Object(_) | Value::Array(_) => false,
            _ => expression_matches(expression, &render(resource), numeric(resource)),
        },
        Value::Object(_) | Value::Array(_) => false,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `a|b` alternatives, `!` negation, `>`, `<`, `>=`, `<=` numeric comparisons,
/// otherwise a wildcard match
fn expression_matches(expression: &str, actual: &str, actual_number: Option<f64>) -> bool {
    expression
        .split('|')
        .map(str::trim)
        .any(|alternative| alternative_matches(alternative, actual, actual_number))
}

fn alternative_matches(alternative: &str, actual: &str, actual_number: Option<f64>) -> bool {
    if let Some(negated) = alternative.strip_prefix('!') {
        return !alternative_matches(negated.trim(), actual, actual_number);
    }

    for (operator, compare) in [
        (">=", (|a: f64, b: f64| a >= b) as fn(f64, f64) -> bool),
        ("<=", |a, b| a <= b),
        (">", |a, b| a > b),
        ("<", |a, b| a < b),
    ] {
        if let Some(operand) = alternative.strip_prefix(operator) {
            return match (actual_number, operand.trim().parse::<f64>()) {
                (Some(a), Ok(b)) => compare(a, b),
                _ => false,
            };
        }
    }

    wildcard_match(alternative, actual)
}

/// Glob match: `*` any run of characters, `?` exactly one character
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::RuleStatus;
    use crate::domain::policy::{FailureAction, PolicyDefinition, PolicyRule, PolicyScope};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn rule(value: Value) -> PolicyRule {
        serde_json::from_value(value).unwrap()
    }

    fn policy() -> PolicyDefinition {
        PolicyDefinition {
            name: "test".to_string(),
            namespace: String::new(),
            scope: PolicyScope::Cluster,
            failure_action: FailureAction::Audit,
            annotations: BTreeMap::new(),
            rules: vec![],
        }
    }

    async fn evaluate(rule: &PolicyRule, resource: Value) -> Result<RuleVerdict, EvaluationError> {
        let policy = policy();
        let resource = ResolvedResource::new(resource);
        PatternEvaluator::new()
            .evaluate(EvaluationContext {
                policy: &policy,
                rule,
                rule_kind: rule.kind(),
                resource: &resource,
            })
            .await
    }

    fn pod(spec: Value) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "namespace": "default", "labels": {"app": "web"}},
            "spec": spec
        })
    }

    fn privileged_rule() -> PolicyRule {
        rule(json!({
            "name": "privileged-containers",
            "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
            "validate": {
                "message": "Privileged mode is disallowed.",
                "pattern": {"spec": {"containers": [{"=(securityContext)": {"=(privileged)": "false"}}]}}
            }
        }))
    }

    #[test]
    fn test_wildcards() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("?*", "x"));
        assert!(!wildcard_match("?*", ""));
        assert!(wildcard_match("*:latest", "nginx:latest"));
        assert!(!wildcard_match("*:latest", "nginx:1.25"));
        assert!(wildcard_match("kube-*", "kube-system"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_expressions() {
        assert!(expression_matches("!default", "prod", None));
        assert!(!expression_matches("!default", "default", None));
        assert!(expression_matches("Always|IfNotPresent", "IfNotPresent", None));
        assert!(expression_matches(">0", "10", Some(10.0)));
        assert!(!expression_matches(">0", "0", Some(0.0)));
        assert!(expression_matches("<=512", "512", Some(512.0)));
        assert!(!expression_matches(">0", "abc", None));
    }

    #[tokio::test]
    async fn test_pattern_pass_and_optional_anchor() {
        let verdict = evaluate(&privileged_rule(), pod(json!({"containers": [{"name": "a"}]})))
            .await
            .unwrap();
        assert_eq!(verdict.status, RuleStatus::Pass);

        let verdict = evaluate(
            &privileged_rule(),
            pod(json!({"containers": [{"name": "a", "securityContext": {"privileged": false}}]})),
        )
        .await
        .unwrap();
        assert_eq!(verdict.status, RuleStatus::Pass);
    }

    #[tokio::test]
    async fn test_pattern_failure_reports_path() {
        let verdict = evaluate(
            &privileged_rule(),
            pod(json!({"containers": [
                {"name": "ok"},
                {"name": "bad", "securityContext": {"privileged": true}}
            ]})),
        )
        .await
        .unwrap();
        assert_eq!(verdict.status, RuleStatus::Fail);
        assert!(verdict.message.contains("Privileged mode is disallowed."));
        assert!(verdict
            .message
            .contains("/spec/containers/1/securityContext/privileged/"));
    }

    #[tokio::test]
    async fn test_absence_anchor() {
        let host_path = rule(json!({
            "name": "host-path",
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"pattern": {"spec": {"=(volumes)": [{"X(hostPath)": "null"}]}}}
        }));
        let ok = evaluate(&host_path, pod(json!({"volumes": [{"name": "data", "emptyDir": {}}]})))
            .await
            .unwrap();
        assert_eq!(ok.status, RuleStatus::Pass);

        let bad = evaluate(
            &host_path,
            pod(json!({"volumes": [{"name": "data", "hostPath": {"path": "/"}}]})),
        )
        .await
        .unwrap();
        assert_eq!(bad.status, RuleStatus::Fail);
    }

    #[tokio::test]
    async fn test_any_pattern() {
        let non_root = rule(json!({
            "name": "run-as-non-root",
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"anyPattern": [
                {"spec": {"securityContext": {"runAsNonRoot": "true"}}},
                {"spec": {"containers": [{"securityContext": {"runAsNonRoot": "true"}}]}}
            ]}
        }));
        let second = evaluate(
            &non_root,
            pod(json!({"containers": [{"securityContext": {"runAsNonRoot": true}}]})),
        )
        .await
        .unwrap();
        assert_eq!(second.status, RuleStatus::Pass);

        let neither = evaluate(&non_root, pod(json!({"containers": [{}]}))).await.unwrap();
        assert_eq!(neither.status, RuleStatus::Fail);
        assert!(neither.message.contains("anyPattern[1]"));
    }

    #[tokio::test]
    async fn test_non_matching_kind_is_skip() {
        let verdict = evaluate(
            &privileged_rule(),
            json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "d"}}),
        )
        .await
        .unwrap();
        assert_eq!(verdict.status, RuleStatus::Skip);
    }

    #[tokio::test]
    async fn test_exclude_namespace_is_skip() {
        let excluded = rule(json!({
            "name": "r",
            "match": {"resources": {"kinds": ["Pod"]}},
            "exclude": {"resources": {"namespaces": ["default"]}},
            "validate": {"pattern": {"metadata": {"name": "?*"}}}
        }));
        let verdict = evaluate(&excluded, pod(json!({}))).await.unwrap();
        assert_eq!(verdict.status, RuleStatus::Skip);
        assert!(verdict.message.contains("excluded"));
    }

    #[tokio::test]
    async fn test_selector_and_group_version_kind_match() {
        let selected = rule(json!({
            "name": "r",
            "match": {"all": [
                {"resources": {"kinds": ["v1/Pod"]}},
                {"resources": {"selector": {"matchLabels": {"app": "w*"}}}}
            ]},
            "validate": {"pattern": {"metadata": {"name": "web"}}}
        }));
        let verdict = evaluate(&selected, pod(json!({}))).await.unwrap();
        assert_eq!(verdict.status, RuleStatus::Pass);
    }

    #[tokio::test]
    async fn test_deny_rules_are_unsupported() {
        let deny = rule(json!({
            "name": "deny-it",
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"deny": {"conditions": {"any": []}}}
        }));
        let err = evaluate(&deny, pod(json!({}))).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_mutate_rules_are_skipped() {
        let mutate = rule(json!({
            "name": "add-label",
            "match": {"resources": {"kinds": ["Pod"]}},
            "mutate": {"patchStrategicMerge": {"metadata": {"labels": {"x": "y"}}}}
        }));
        let verdict = evaluate(&mutate, pod(json!({}))).await.unwrap();
        assert_eq!(verdict.status, RuleStatus::Skip);
        assert!(verdict.message.contains("mutate"));
    }

    #[tokio::test]
    async fn test_numeric_pattern_against_number() {
        let ports = rule(json!({
            "name": "host-ports",
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"pattern": {"spec": {"containers": [{"=(ports)": [{"=(hostPort)": 0}]}]}}}
        }));
        let ok = evaluate(&ports, pod(json!({"containers": [{"ports": [{"containerPort": 80}]}]})))
            .await
            .unwrap();
        assert_eq!(ok.status, RuleStatus::Pass);
        let bad = evaluate(&ports, pod(json!({"containers": [{"ports": [{"hostPort": 8080}]}]})))
            .await
            .unwrap();
        assert_eq!(bad.status, RuleStatus::Fail);
    }
}
