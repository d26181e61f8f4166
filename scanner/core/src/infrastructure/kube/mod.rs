// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Kubernetes Cluster Access
//!
//! Credential resolution and the reqwest-backed `ClusterApi` implementation.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Build a read-only API client for the target cluster
//! - **Integration:** kubeconfig / service account → `KubeApiClient` → resolver
//!
//! Default credential order, applied only when a request carries no
//! explicit override:
//!
//! 1. `spec.cluster.kubeconfig` from the scanner config (or `KSCAN_KUBECONFIG`)
//! 2. `KUBECONFIG` (first entry of the path list)
//! 3. In-cluster service account, when `KUBERNETES_SERVICE_HOST` is set
//! 4. `~/.kube/config`

pub mod client;
pub mod kubeconfig;

pub use client::KubeApiClient;
pub use kubeconfig::{ClusterAuth, ClusterEndpoint, Kubeconfig, KubeconfigError};

use crate::domain::cluster::{ClusterApi, ClusterConnector, CredentialSource};
use crate::domain::config::ClusterConfig;
use crate::domain::errors::ScanError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct KubeConnector {
    cluster: ClusterConfig,
    page_size: u32,
}

impl KubeConnector {
    pub fn new(cluster: ClusterConfig, page_size: u32) -> Self {
        Self { cluster, page_size }
    }

    fn endpoint_from_file(&self, path: &Path) -> Result<ClusterEndpoint, ScanError> {
        let config = Kubeconfig::from_file(path).map_err(configuration_error)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config
            .endpoint(self.cluster.context.as_deref(), base_dir)
            .map_err(configuration_error)
    }

    fn default_endpoint(&self) -> Result<ClusterEndpoint, ScanError> {
        if let Some(path) = self.cluster.kubeconfig.as_deref().filter(|p| !p.is_empty()) {
            debug!(path, "Using kubeconfig from scanner configuration");
            return self.endpoint_from_file(Path::new(path));
        }

        if let Ok(paths) = std::env::var("KUBECONFIG") {
            if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
                debug!(path = %first.display(), "Using kubeconfig from KUBECONFIG");
                return self.endpoint_from_file(&first);
            }
        }

        if let Ok(host) = std::env::var("KUBERNETES_SERVICE_HOST") {
            if !host.is_empty() {
                let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_default();
                debug!(host = %host, "Using in-cluster service account");
                return kubeconfig::in_cluster_endpoint(
                    &host,
                    &port,
                    Path::new(kubeconfig::SERVICE_ACCOUNT_DIR),
                )
                .map_err(configuration_error);
            }
        }

        let home_config = dirs::home_dir()
            .map(|home| home.join(".kube").join("config"))
            .filter(|path| path.exists());
        match home_config {
            Some(path) => {
                debug!(path = %path.display(), "Using kubeconfig from home directory");
                self.endpoint_from_file(&path)
            }
            None => Err(ScanError::Configuration(
                "no cluster credentials found: set spec.cluster.kubeconfig, KUBECONFIG, \
                 run in-cluster, or provide ~/.kube/config"
                    .to_string(),
            )),
        }
    }

    pub fn endpoint(&self, credential: &CredentialSource) -> Result<ClusterEndpoint, ScanError> {
        match credential {
            CredentialSource::Explicit(path) => self.endpoint_from_file(&expand_home(path)),
            CredentialSource::Default => self.default_endpoint(),
        }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    async fn connect(
        &self,
        credential: &CredentialSource,
    ) -> Result<Arc<dyn ClusterApi>, ScanError> {
        let endpoint = self.endpoint(credential)?;
        let client = KubeApiClient::new(
            &endpoint,
            Duration::from_secs(self.cluster.request_timeout_seconds),
            self.page_size,
        )
        .map_err(|e| ScanError::Configuration(e.to_string()))?;
        info!(server = %client.server(), "Connected to cluster API");
        Ok(Arc::new(client))
    }
}

fn configuration_error(err: KubeconfigError) -> ScanError {
    ScanError::Configuration(err.to_string())
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceLocator;
    use serde_json::json;

    fn write_kubeconfig(dir: &Path, server: &str) -> PathBuf {
        let path = dir.join("config");
        let yaml = format!(
            r#"
current-context: test
clusters:
  - name: test
    cluster:
      server: {server}
users:
  - name: test
    user:
      token: test-token
contexts:
  - name: test
    context:
      cluster: test
      user: test
"#
        );
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[tokio::test]
    async fn test_explicit_credential_connects_to_its_server() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/nodes/worker-1")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(json!({"apiVersion": "v1", "kind": "Node", "metadata": {"name": "worker-1"}}).to_string())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_kubeconfig(dir.path(), &server.url());

        let connector = KubeConnector::new(ClusterConfig::default(), 100);
        let api = connector
            .connect(&CredentialSource::Explicit(path))
            .await
            .unwrap();
        let node = api
            .get(&ResourceLocator::new("", "v1", "nodes"), None, "worker-1")
            .await
            .unwrap();
        assert_eq!(node.name(), "worker-1");
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_configuration_error() {
        let connector = KubeConnector::new(ClusterConfig::default(), 100);
        let result = connector
            .connect(&CredentialSource::Explicit(PathBuf::from(
                "/nonexistent/kubeconfig",
            )))
            .await;
        match result {
            Err(ScanError::Configuration(message)) => {
                assert!(message.contains("/nonexistent/kubeconfig"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_explicit_override_wins_over_configured_default() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write_kubeconfig(dir.path(), "https://explicit.example.com");

        let cluster = ClusterConfig {
            kubeconfig: Some("/nonexistent/configured".to_string()),
            ..Default::default()
        };
        let connector = KubeConnector::new(cluster, 100);

        let endpoint = connector
            .endpoint(&CredentialSource::Explicit(explicit))
            .unwrap();
        assert_eq!(endpoint.server, "https://explicit.example.com");
        assert!(connector.endpoint(&CredentialSource::Default).is_err());
    }
}
