// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scan Error Taxonomy
//!
//! Resolver and loader failures abort the whole request. Per-rule evaluation
//! failures are recovered into `error` outcomes by the orchestrator and only
//! surface here when a caller evaluates a rule directly. A missing reporting
//! capability is recovered at the presentation boundary into guidance text.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Errors surfaced by every pipeline step

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Unmapped resource kind, malformed query, unusable credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request rejected before the pipeline runs
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A named resource does not exist
    #[error("{kind} '{name}' not found{}", namespace_suffix(.namespace))]
    NotFound {
        kind: String,
        name: String,
        namespace: Option<String>,
    },

    /// Policy file, directory or bundle unreadable or unparseable
    #[error("Policy source error ({source_ref}): {message}")]
    Source { source_ref: String, message: String },

    /// API or network failure, wrapped with the originating context
    #[error("Transport error while {context}: {message}")]
    Transport { context: String, message: String },

    /// A single rule evaluation failed
    #[error("Evaluation of rule '{rule}' in policy '{policy}' failed: {message}")]
    Evaluation {
        policy: String,
        rule: String,
        message: String,
    },

    /// The target cluster lacks a required reporting capability
    #[error("Capability missing: {0}")]
    CapabilityMissing(String),

    #[error("Operation cancelled during {0}")]
    Cancelled(String),
}

fn namespace_suffix(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!(" in namespace '{}'", ns),
        _ => String::new(),
    }
}

impl ScanError {
    pub fn source_error(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_ref: source_ref.into(),
            message: message.into(),
        }
    }

    pub fn transport(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            message: message.into(),
        }
    }

    /// True for errors the presentation layer turns into guidance instead of a failure
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, Self::CapabilityMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_resource() {
        let err = ScanError::NotFound {
            kind: "Deployment".to_string(),
            name: "missing".to_string(),
            namespace: Some("default".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Deployment 'missing' not found in namespace 'default'"
        );
    }

    #[test]
    fn test_not_found_without_namespace() {
        let err = ScanError::NotFound {
            kind: "Node".to_string(),
            name: "worker-1".to_string(),
            namespace: None,
        };
        assert_eq!(err.to_string(), "Node 'worker-1' not found");
    }

    #[test]
    fn test_source_error_names_path() {
        let err = ScanError::source_error("/tmp/missing.yaml", "path does not exist");
        assert!(err.to_string().contains("/tmp/missing.yaml"));
    }
}
