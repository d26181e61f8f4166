// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kubernetes REST Adapter
//!
//! Anti-Corruption Layer between the ClusterApi port and the Kubernetes REST
//! API. Read-only: GET on items, paginated GET on collections, group discovery.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** reqwest-backed `ClusterApi`

use super::kubeconfig::{ClusterAuth, ClusterEndpoint};
use crate::domain::cluster::{ApiError, ClusterApi, ListOptions};
use crate::domain::resource::{ResolvedResource, ResourceLocator};
use async_trait::async_trait;
use reqwest::{Certificate, Identity, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct KubeApiClient {
    client: reqwest::Client,
    server: String,
    auth: ClusterAuth,
    page_size: u32,
}

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default, rename = "apiVersion")]
    api_version: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    metadata: ListMetadata,
}

#[derive(Deserialize, Default)]
struct ListMetadata {
    #[serde(default, rename = "continue")]
    continue_token: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroup {
    #[serde(default)]
    versions: Vec<GroupVersionForDiscovery>,
    #[serde(default)]
    preferred_version: Option<GroupVersionForDiscovery>,
}

#[derive(Deserialize, Clone)]
struct GroupVersionForDiscovery {
    version: String,
}

impl KubeApiClient {
    pub fn new(
        endpoint: &ClusterEndpoint,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        if let Some(ca_pem) = &endpoint.ca_pem {
            let certs = Certificate::from_pem_bundle(ca_pem)
                .map_err(|e| ApiError::Transport(format!("invalid cluster CA bundle: {}", e)))?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        if endpoint.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let ClusterAuth::ClientCertificate { cert_pem, key_pem } = &endpoint.auth {
            let mut pem = cert_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(key_pem);
            let identity = Identity::from_pem(&pem)
                .map_err(|e| ApiError::Transport(format!("invalid client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server: endpoint.server.trim_end_matches('/').to_string(),
            auth: endpoint.auth.clone(),
            page_size,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn get_request(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}{}", self.server, path))
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.auth {
            ClusterAuth::Bearer(token) => request.bearer_auth(token),
            ClusterAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            ClusterAuth::Anonymous | ClusterAuth::ClientCertificate { .. } => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StatusBody>(&body)
            .ok()
            .map(|s| s.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(what.to_string()))
        } else {
            Err(ApiError::Status {
                code: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ClusterApi for KubeApiClient {
    async fn get(
        &self,
        locator: &ResourceLocator,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResolvedResource, ApiError> {
        let path = locator.item_path(namespace, name);
        debug!(path = %path, "GET item");
        let response = self.send(self.get_request(&path), &path).await?;
        let document: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(ResolvedResource::new(document))
    }

    async fn list(
        &self,
        locator: &ResourceLocator,
        options: &ListOptions,
    ) -> Result<Vec<ResolvedResource>, ApiError> {
        let path = locator.collection_path(options.namespace.as_deref());
        let mut resources = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("limit", self.page_size.to_string())];
            if let Some(selector) = &options.label_selector {
                query.push(("labelSelector", selector.clone()));
            }
            if let Some(selector) = &options.field_selector {
                query.push(("fieldSelector", selector.clone()));
            }
            if let Some(token) = &continue_token {
                query.push(("continue", token.clone()));
            }

            debug!(path = %path, page = ?continue_token, "GET collection");
            let response = self
                .send(self.get_request(&path).query(&query), &path)
                .await?;
            let envelope: ListEnvelope = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            let item_kind = envelope
                .kind
                .strip_suffix("List")
                .unwrap_or(&envelope.kind)
                .to_string();
            let item_api_version = if envelope.api_version.is_empty() {
                locator.group_version()
            } else {
                envelope.api_version.clone()
            };

            for item in envelope.items {
                let mut resource = ResolvedResource::new(item);
                resource.stamp_type(&item_api_version, &item_kind);
                resources.push(resource);
            }

            match envelope.metadata.continue_token.filter(|t| !t.is_empty()) {
                Some(token) => continue_token = Some(token),
                None => break,
            }
        }

        Ok(resources)
    }

    async fn api_group_versions(&self, group: &str) -> Result<Vec<String>, ApiError> {
        let path = if group.is_empty() {
            "/api".to_string()
        } else {
            format!("/apis/{}", group)
        };

        let response = match self.send(self.get_request(&path), &path).await {
            Ok(response) => response,
            Err(ApiError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if group.is_empty() {
            #[derive(Deserialize)]
            struct ApiVersions {
                #[serde(default)]
                versions: Vec<String>,
            }
            let versions: ApiVersions = response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            return Ok(versions.versions);
        }

        let api_group: ApiGroup = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        // Preferred version first, then the rest in served order
        let mut versions: Vec<String> = Vec::new();
        if let Some(preferred) = api_group.preferred_version {
            versions.push(preferred.version);
        }
        for version in api_group.versions {
            if !versions.contains(&version.version) {
                versions.push(version.version);
            }
        }
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard, auth: ClusterAuth, page_size: u32) -> KubeApiClient {
        let endpoint = ClusterEndpoint {
            server: server.url(),
            ca_pem: None,
            insecure_skip_tls_verify: false,
            auth,
            namespace: None,
        };
        KubeApiClient::new(&endpoint, Duration::from_secs(5), page_size).unwrap()
    }

    #[tokio::test]
    async fn test_get_named_item_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/namespaces/default/pods/test-pod")
            .match_header("authorization", "Bearer sekret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "apiVersion": "v1",
                    "kind": "Pod",
                    "metadata": {"name": "test-pod", "namespace": "default", "uid": "u-1"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Bearer("sekret".to_string()), 500);
        let pods = ResourceLocator::new("", "v1", "pods");
        let pod = client.get(&pods, Some("default"), "test-pod").await.unwrap();

        assert_eq!(pod.name(), "test-pod");
        assert_eq!(pod.uid(), "u-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_item_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/apis/apps/v1/namespaces/default/deployments/missing")
            .with_status(404)
            .with_body(r#"{"kind":"Status","message":"deployments.apps \"missing\" not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Anonymous, 500);
        let deployments = ResourceLocator::new("apps", "v1", "deployments");
        let err = client
            .get(&deployments, Some("default"), "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_forbidden_carries_status_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/secrets")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"kind":"Status","message":"secrets is forbidden"}"#)
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Anonymous, 500);
        let secrets = ResourceLocator::new("", "v1", "secrets");
        let err = client.list(&secrets, &ListOptions::default()).await.unwrap_err();
        match err {
            ApiError::Status { code, message } => {
                assert_eq!(code, 403);
                assert_eq!(message, "secrets is forbidden");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_follows_continue_and_stamps_items() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v1/namespaces/default/pods")
            .match_query(Matcher::Exact("limit=1&labelSelector=app%3Dweb".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "apiVersion": "v1",
                    "kind": "PodList",
                    "metadata": {"continue": "page-2"},
                    "items": [{"metadata": {"name": "web-1", "namespace": "default"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v1/namespaces/default/pods")
            .match_query(Matcher::Exact(
                "limit=1&labelSelector=app%3Dweb&continue=page-2".to_string(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "apiVersion": "v1",
                    "kind": "PodList",
                    "metadata": {},
                    "items": [{"metadata": {"name": "web-2", "namespace": "default"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Anonymous, 1);
        let options = ListOptions {
            namespace: Some("default".to_string()),
            label_selector: Some("app=web".to_string()),
            field_selector: None,
        };
        let pods = client
            .list(&ResourceLocator::new("", "v1", "pods"), &options)
            .await
            .unwrap();

        let names: Vec<&str> = pods.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
        assert!(pods.iter().all(|p| p.kind() == "Pod" && p.api_version() == "v1"));
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_group_discovery_prefers_preferred_version() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/apis/wgpolicyk8s.io")
            .with_status(200)
            .with_body(
                json!({
                    "kind": "APIGroup",
                    "name": "wgpolicyk8s.io",
                    "versions": [
                        {"groupVersion": "wgpolicyk8s.io/v1alpha1", "version": "v1alpha1"},
                        {"groupVersion": "wgpolicyk8s.io/v1alpha2", "version": "v1alpha2"}
                    ],
                    "preferredVersion": {"groupVersion": "wgpolicyk8s.io/v1alpha2", "version": "v1alpha2"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Anonymous, 500);
        let versions = client.api_group_versions("wgpolicyk8s.io").await.unwrap();
        assert_eq!(versions, vec!["v1alpha2", "v1alpha1"]);
    }

    #[tokio::test]
    async fn test_absent_group_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/apis/wgpolicyk8s.io")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server, ClusterAuth::Anonymous, 500);
        assert!(client
            .api_group_versions("wgpolicyk8s.io")
            .await
            .unwrap()
            .is_empty());
    }
}
