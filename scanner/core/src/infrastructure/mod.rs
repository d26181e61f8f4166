// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Adapters behind the domain ports: cluster access, policy sources and the
//! built-in rule engine.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer

pub mod bundles;
pub mod kube;
pub mod locator_table;
pub mod pattern_evaluator;
pub mod policy_loader;
pub mod policy_reports;
pub mod resource_resolver;

pub use kube::KubeConnector;
pub use pattern_evaluator::PatternEvaluator;
pub use policy_loader::PolicyLoader;
pub use resource_resolver::ResourceResolver;
