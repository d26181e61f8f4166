// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring shared by every command

use std::sync::Arc;

use kscan_core::application::{ApplyService, ViolationsService};
use kscan_core::domain::config::ScannerConfig;
use kscan_core::domain::cluster::{ClusterConnector, CredentialSource};
use kscan_core::infrastructure::{KubeConnector, PatternEvaluator};
use kscan_core::presentation::ToolCatalog;

pub struct ScanContext {
    pub config: ScannerConfig,
    /// `--kubeconfig`, overrides the configured default credentials
    pub kubeconfig: Option<String>,
    pub apply: Arc<ApplyService>,
    pub violations: Arc<ViolationsService>,
}

impl ScanContext {
    pub fn new(config: ScannerConfig, kubeconfig: Option<String>) -> Self {
        let connector: Arc<dyn ClusterConnector> = Arc::new(KubeConnector::new(
            config.spec.cluster.clone(),
            config.spec.resolution.page_size,
        ));
        Self::with_connector(config, kubeconfig, connector)
    }

    pub fn with_connector(
        config: ScannerConfig,
        kubeconfig: Option<String>,
        connector: Arc<dyn ClusterConnector>,
    ) -> Self {
        let apply = Arc::new(ApplyService::new(
            connector.clone(),
            Arc::new(PatternEvaluator::new()),
            &config.spec,
        ));
        let violations = Arc::new(ViolationsService::new(connector, &config.spec));
        Self {
            config,
            kubeconfig,
            apply,
            violations,
        }
    }

    pub fn credential(&self) -> CredentialSource {
        CredentialSource::from_override(self.kubeconfig.as_deref())
    }

    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::new(self.apply.clone(), self.violations.clone())
            .with_target_credential(self.kubeconfig.clone())
            .with_source(self.config.spec.report.source.clone())
    }
}
