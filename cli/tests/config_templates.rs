// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use kscan_cli::commands::config::{TEMPLATE_MINIMAL, TEMPLATE_WITH_EXAMPLES};
use kscan_core::domain::config::{EmptyNamespace, ScannerConfig};

#[test]
fn test_minimal_template_is_valid() {
    let config = ScannerConfig::from_yaml_str(TEMPLATE_MINIMAL).unwrap();
    config.validate().unwrap();
    assert_eq!(config.spec.resolution.page_size, 500);
    assert_eq!(
        config.spec.report.excluded_namespaces,
        vec!["kube-system".to_string(), "kyverno".to_string()]
    );
}

#[test]
fn test_example_template_matches_defaults() {
    let config = ScannerConfig::from_yaml_str(TEMPLATE_WITH_EXAMPLES).unwrap();
    config.validate().unwrap();

    let defaults = ScannerConfig::default();
    assert_eq!(config.spec.resolution.empty_namespace, EmptyNamespace::AllNamespaces);
    assert_eq!(config.spec.server.port, defaults.spec.server.port);
    assert_eq!(config.spec.evaluation.concurrency, defaults.spec.evaluation.concurrency);
    assert_eq!(config.spec.report.source, defaults.spec.report.source);
    assert!(config.spec.cluster.kubeconfig.is_none());
    assert!(!config.spec.policies.recursive);
}
