// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scan Planner
//!
//! Derives the resource queries a curated-bundle scan needs from the kinds
//! its policies match on. Namespaced kinds get the requested namespace,
//! cluster-scoped kinds never do.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Derive resource queries from loaded policies

use crate::domain::policy::PolicyDefinition;
use crate::domain::resource::ResourceQuery;
use crate::infrastructure::locator_table;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Namespace argument that selects every namespace
pub const ALL_NAMESPACES: &str = "all";

pub struct ScanPlanner {
    default_namespace: String,
}

impl ScanPlanner {
    pub fn new(default_namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: default_namespace.into(),
        }
    }

    /// `all` → every namespace, empty → the configured default, otherwise as given
    pub fn target_namespace(&self, namespace: &str) -> Option<String> {
        match namespace.trim() {
            ALL_NAMESPACES => None,
            "" => Some(self.default_namespace.clone()),
            ns => Some(ns.to_string()),
        }
    }

    pub fn plan(&self, policies: &[PolicyDefinition], namespace: &str) -> Vec<ResourceQuery> {
        let target = self.target_namespace(namespace);
        let mut seen = HashSet::new();
        let mut queries = Vec::new();

        let kinds = policies
            .iter()
            .flat_map(|policy| policy.rules.iter())
            .flat_map(|rule| rule.match_criteria.kinds());

        for kind_ref in kinds {
            if kind_ref.contains(['*', '?']) {
                warn!(kind = kind_ref, "Wildcard match kind cannot be planned, skipping");
                continue;
            }
            let Some(entry) = locator_table::resolve_kind(kind_ref) else {
                warn!(kind = kind_ref, "Unsupported match kind, skipping");
                continue;
            };
            if !seen.insert((entry.api_version.as_str(), entry.kind)) {
                continue;
            }

            let mut query = ResourceQuery::new(entry.api_version.clone(), entry.kind);
            if entry.namespaced {
                if let Some(ns) = &target {
                    query = query.in_namespace(ns.clone());
                }
            }
            debug!(query = %query, "Planned scan query");
            queries.push(query);
        }
        queries
    }
}
