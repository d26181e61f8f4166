// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Curated Policy Bundles
//!
//! Policy sets compiled into the binary and selectable by key. The `all` key
//! concatenates every bundle, in declaration order, as one multi-document
//! YAML stream.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Embedded policy sets for the policy loader

use std::borrow::Cow;

pub const ALL_BUNDLES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyBundle {
    pub key: &'static str,
    pub description: &'static str,
    pub content: &'static str,
}

pub const BUNDLES: &[PolicyBundle] = &[
    PolicyBundle {
        key: "pod-security",
        description: "Pod Security Standards baseline and restricted checks",
        content: include_str!("../../policies/pod-security.yaml"),
    },
    PolicyBundle {
        key: "rbac-best-practices",
        description: "Role binding and service account hygiene",
        content: include_str!("../../policies/rbac-best-practices.yaml"),
    },
    PolicyBundle {
        key: "kubernetes-best-practices",
        description: "Labels, image tags, resources, probes and namespace usage",
        content: include_str!("../../policies/kubernetes-best-practices.yaml"),
    },
];

pub fn find(key: &str) -> Option<&'static PolicyBundle> {
    BUNDLES.iter().find(|bundle| bundle.key == key)
}

pub fn is_bundle_key(key: &str) -> bool {
    key == ALL_BUNDLES || find(key).is_some()
}

pub fn keys() -> Vec<&'static str> {
    std::iter::once(ALL_BUNDLES)
        .chain(BUNDLES.iter().map(|bundle| bundle.key))
        .collect()
}

/// YAML content for a bundle key, `None` for unknown keys
pub fn content(key: &str) -> Option<Cow<'static, str>> {
    if key == ALL_BUNDLES {
        return Some(Cow::Owned(all_content()));
    }
    find(key).map(|bundle| Cow::Borrowed(bundle.content))
}

fn all_content() -> String {
    BUNDLES
        .iter()
        .map(|bundle| bundle.content.trim())
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Key used by the assistant-facing scan: unknown or empty keys fall back to `all`
pub fn select(key: &str) -> &str {
    let key = key.trim();
    if is_bundle_key(key) {
        key
    } else {
        if !key.is_empty() {
            tracing::warn!(policy_sets = key, "Unknown policy set, scanning with all bundles");
        }
        ALL_BUNDLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_list_all_first() {
        assert_eq!(
            keys(),
            vec!["all", "pod-security", "rbac-best-practices", "kubernetes-best-practices"]
        );
    }

    #[test]
    fn test_all_concatenates_every_bundle() {
        let all = content(ALL_BUNDLES).unwrap();
        for bundle in BUNDLES {
            assert!(all.contains(bundle.content.trim()));
        }
    }

    #[test]
    fn test_unknown_key_selects_all() {
        assert_eq!(select("pod-security"), "pod-security");
        assert_eq!(select("best-practices-k8s"), ALL_BUNDLES);
        assert_eq!(select(""), ALL_BUNDLES);
        assert!(content("best-practices-k8s").is_none());
    }
}
