// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Rule Evaluation Port
//!
//! Evaluation semantics live outside this crate. The orchestrator only calls
//! this trait and interprets what comes back.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Seam to the external rule-evaluation engine

use crate::domain::outcome::RuleStatus;
use crate::domain::policy::{PolicyDefinition, PolicyRule, RuleKind};
use crate::domain::resource::ResolvedResource;
use async_trait::async_trait;
use thiserror::Error;

/// Verdict for one (rule, resource) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub status: RuleStatus,
    pub message: String,
}

impl RuleVerdict {
    pub fn new(status: RuleStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(RuleStatus::Pass, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(RuleStatus::Fail, message)
    }

    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(RuleStatus::Skip, message)
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("unsupported rule: {0}")]
    Unsupported(String),

    #[error("malformed rule: {0}")]
    Malformed(String),

    #[error("engine failure: {0}")]
    Engine(String),
}

/// Everything the engine may look at for one evaluation
pub struct EvaluationContext<'a> {
    pub policy: &'a PolicyDefinition,
    pub rule: &'a PolicyRule,
    /// Inferred once per rule by the caller
    pub rule_kind: RuleKind,
    pub resource: &'a ResolvedResource,
}

#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn evaluate(&self, ctx: EvaluationContext<'_>) -> Result<RuleVerdict, EvaluationError>;
}
