// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! GVK → Locator Table
//!
//! Process-wide, read-only mapping from (apiVersion, kind) to the REST
//! collection that serves it. Built on first use and never mutated, so
//! concurrent readers need no synchronisation.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Static GVK → REST collection lookup

use crate::domain::errors::ScanError;
use crate::domain::resource::{ResourceLocator, ResourceQuery};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorEntry {
    pub api_version: String,
    pub kind: &'static str,
    pub locator: ResourceLocator,
    /// Read by the scan planner and by default-namespace substitution
    pub namespaced: bool,
}

// (group, version, kind, plural, namespaced)
const KNOWN_KINDS: &[(&str, &str, &str, &str, bool)] = &[
    // Core
    ("", "v1", "Pod", "pods", true),
    ("", "v1", "Service", "services", true),
    ("", "v1", "Namespace", "namespaces", false),
    ("", "v1", "Node", "nodes", false),
    ("", "v1", "ConfigMap", "configmaps", true),
    ("", "v1", "Secret", "secrets", true),
    ("", "v1", "ServiceAccount", "serviceaccounts", true),
    ("", "v1", "PersistentVolume", "persistentvolumes", false),
    ("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", true),
    // Apps
    ("apps", "v1", "Deployment", "deployments", true),
    ("apps", "v1", "StatefulSet", "statefulsets", true),
    ("apps", "v1", "DaemonSet", "daemonsets", true),
    ("apps", "v1", "ReplicaSet", "replicasets", true),
    // Batch
    ("batch", "v1", "Job", "jobs", true),
    ("batch", "v1", "CronJob", "cronjobs", true),
    // Networking
    ("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies", true),
    ("networking.k8s.io", "v1", "Ingress", "ingresses", true),
    // RBAC
    ("rbac.authorization.k8s.io", "v1", "Role", "roles", true),
    ("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", true),
    ("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", false),
    ("rbac.authorization.k8s.io", "v1", "ClusterRoleBinding", "clusterrolebindings", false),
    // Storage
    ("storage.k8s.io", "v1", "StorageClass", "storageclasses", false),
];

struct LocatorTable {
    entries: Vec<LocatorEntry>,
    by_key: HashMap<String, usize>,
}

static TABLE: Lazy<LocatorTable> = Lazy::new(|| {
    let entries: Vec<LocatorEntry> = KNOWN_KINDS
        .iter()
        .map(|&(group, version, kind, plural, namespaced)| {
            let locator = ResourceLocator::new(group, version, plural);
            LocatorEntry {
                api_version: locator.group_version(),
                kind,
                locator,
                namespaced,
            }
        })
        .collect();
    let by_key = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| (table_key(&entry.api_version, entry.kind), index))
        .collect();
    LocatorTable { entries, by_key }
});

fn table_key(api_version: &str, kind: &str) -> String {
    format!("{}/{}", api_version, kind)
}

/// Exact (apiVersion, kind) lookup. Empty apiVersion means the core group.
pub fn lookup(api_version: &str, kind: &str) -> Option<&'static LocatorEntry> {
    let api_version = if api_version.is_empty() { "v1" } else { api_version };
    let table = &*TABLE;
    table
        .by_key
        .get(&table_key(api_version, kind))
        .map(|&index| &table.entries[index])
}

/// Locator for a query, or a configuration error naming the query
pub fn locate(query: &ResourceQuery) -> Result<ResourceLocator, ScanError> {
    lookup(query.effective_api_version(), &query.kind)
        .map(|entry| entry.locator.clone())
        .ok_or_else(|| {
            ScanError::Configuration(format!(
                "no resource mapping for apiVersion={}, kind={} (query: {})",
                query.effective_api_version(),
                query.kind,
                query
            ))
        })
}

/// Resolve a policy match kind: `Kind`, `version/Kind` or `group/version/Kind`.
/// A bare kind picks the first registered entry with that name.
pub fn resolve_kind(kind_ref: &str) -> Option<&'static LocatorEntry> {
    match kind_ref.rsplit_once('/') {
        Some((api_version, kind)) => lookup(api_version, kind),
        None => TABLE.entries.iter().find(|entry| entry.kind == kind_ref),
    }
}
