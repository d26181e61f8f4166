// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Kubeconfig & In-Cluster Credentials
//!
//! Turns a kubeconfig file (or the pod's service-account mount) into a
//! ClusterEndpoint: API server URL, trust roots and one authentication method.
//! Relative file references resolve against the kubeconfig's directory.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn kubeconfig files into a cluster endpoint

use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, Error)]
pub enum KubeconfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse kubeconfig {path}: {message}")]
    Parse { path: String, message: String },

    #[error("context '{0}' not found in kubeconfig")]
    ContextNotFound(String),

    #[error("cluster '{0}' not found in kubeconfig")]
    ClusterNotFound(String),

    #[error("user '{0}' not found in kubeconfig")]
    UserNotFound(String),

    #[error("kubeconfig has no current-context and no context override was given")]
    NoContext,

    #[error("unsupported authentication for user '{user}': {method}")]
    UnsupportedAuth { user: String, method: String },

    #[error("invalid {field}: {message}")]
    InvalidData { field: String, message: String },

    #[error("not running in a cluster: {0}")]
    NotInCluster(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    pub server: String,
    #[serde(default)]
    pub certificate_authority: Option<String>,
    #[serde(default)]
    pub certificate_authority_data: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    pub token_file: Option<String>,
    #[serde(default)]
    pub client_certificate: Option<String>,
    #[serde(default)]
    pub client_certificate_data: Option<String>,
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub client_key_data: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub exec: Option<serde_yaml::Value>,
    #[serde(default)]
    pub auth_provider: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub enum ClusterAuth {
    Anonymous,
    Bearer(String),
    Basic { username: String, password: String },
    ClientCertificate { cert_pem: Vec<u8>, key_pem: Vec<u8> },
}

impl std::fmt::Debug for ClusterAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
            Self::Basic { username, .. } => write!(f, "Basic({}, <redacted>)", username),
            Self::ClientCertificate { .. } => write!(f, "ClientCertificate(<redacted>)"),
        }
    }
}

/// Everything needed to open an HTTP client against one API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    pub server: String,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
    pub auth: ClusterAuth,
    pub namespace: Option<String>,
}

impl Kubeconfig {
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, KubeconfigError> {
        serde_yaml::from_str(yaml).map_err(|e| KubeconfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, KubeconfigError> {
        let content = read_string(path)?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Resolve the selected context into an endpoint. `base_dir` anchors
    /// relative certificate and token paths.
    pub fn endpoint(
        &self,
        context_override: Option<&str>,
        base_dir: &Path,
    ) -> Result<ClusterEndpoint, KubeconfigError> {
        let context_name = match context_override.filter(|c| !c.is_empty()) {
            Some(name) => name,
            None if !self.current_context.is_empty() => self.current_context.as_str(),
            None => return Err(KubeconfigError::NoContext),
        };

        let context = self
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| KubeconfigError::ContextNotFound(context_name.to_string()))?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| KubeconfigError::ClusterNotFound(context.context.cluster.clone()))?;

        let auth = if context.context.user.is_empty() {
            ClusterAuth::Anonymous
        } else {
            let user = self
                .users
                .iter()
                .find(|u| u.name == context.context.user)
                .ok_or_else(|| KubeconfigError::UserNotFound(context.context.user.clone()))?;
            user_auth(user, base_dir)?
        };

        let ca_pem = inline_or_file(
            cluster.cluster.certificate_authority_data.as_deref(),
            cluster.cluster.certificate_authority.as_deref(),
            base_dir,
            "certificate-authority",
        )?;

        Ok(ClusterEndpoint {
            server: cluster.cluster.server.trim_end_matches('/').to_string(),
            ca_pem,
            insecure_skip_tls_verify: cluster.cluster.insecure_skip_tls_verify,
            auth,
            namespace: context.context.namespace.clone(),
        })
    }
}

fn user_auth(user: &NamedUser, base_dir: &Path) -> Result<ClusterAuth, KubeconfigError> {
    let entry = &user.user;

    if entry.exec.is_some() {
        return Err(KubeconfigError::UnsupportedAuth {
            user: user.name.clone(),
            method: "exec credential plugins".to_string(),
        });
    }
    if entry.auth_provider.is_some() {
        return Err(KubeconfigError::UnsupportedAuth {
            user: user.name.clone(),
            method: "auth-provider".to_string(),
        });
    }

    if let Some(token) = entry.token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(ClusterAuth::Bearer(token.to_string()));
    }
    if let Some(token_file) = entry.token_file.as_deref().filter(|t| !t.is_empty()) {
        let token = read_string(&anchor(base_dir, token_file))?;
        return Ok(ClusterAuth::Bearer(token.trim().to_string()));
    }

    let cert = inline_or_file(
        entry.client_certificate_data.as_deref(),
        entry.client_certificate.as_deref(),
        base_dir,
        "client-certificate",
    )?;
    let key = inline_or_file(
        entry.client_key_data.as_deref(),
        entry.client_key.as_deref(),
        base_dir,
        "client-key",
    )?;
    match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => {
            return Ok(ClusterAuth::ClientCertificate { cert_pem, key_pem })
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(KubeconfigError::InvalidData {
                field: format!("user '{}'", user.name),
                message: "client certificate and client key must both be set".to_string(),
            })
        }
        (None, None) => {}
    }

    if let (Some(username), Some(password)) = (&entry.username, &entry.password) {
        return Ok(ClusterAuth::Basic {
            username: username.clone(),
            password: password.clone(),
        });
    }

    Ok(ClusterAuth::Anonymous)
}

/// In-cluster endpoint from the service-account mount and the
/// `KUBERNETES_SERVICE_HOST` / `KUBERNETES_SERVICE_PORT` pair
pub fn in_cluster_endpoint(
    host: &str,
    port: &str,
    service_account_dir: &Path,
) -> Result<ClusterEndpoint, KubeconfigError> {
    if host.is_empty() {
        return Err(KubeconfigError::NotInCluster(
            "KUBERNETES_SERVICE_HOST is not set".to_string(),
        ));
    }
    let token = read_string(&service_account_dir.join("token"))?;
    let ca_path = service_account_dir.join("ca.crt");
    let ca_pem = if ca_path.exists() {
        Some(read_bytes(&ca_path)?)
    } else {
        None
    };
    let namespace = std::fs::read_to_string(service_account_dir.join("namespace"))
        .ok()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty());

    // IPv6 service hosts need brackets
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    let port = if port.is_empty() { "443" } else { port };

    Ok(ClusterEndpoint {
        server: format!("https://{}:{}", host, port),
        ca_pem,
        insecure_skip_tls_verify: false,
        auth: ClusterAuth::Bearer(token.trim().to_string()),
        namespace,
    })
}

fn inline_or_file(
    data: Option<&str>,
    path: Option<&str>,
    base_dir: &Path,
    field: &str,
) -> Result<Option<Vec<u8>>, KubeconfigError> {
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| KubeconfigError::InvalidData {
                field: format!("{}-data", field),
                message: e.to_string(),
            })?;
        return Ok(Some(decoded));
    }
    match path.filter(|p| !p.is_empty()) {
        Some(path) => read_bytes(&anchor(base_dir, path)).map(Some),
        None => Ok(None),
    }
}

fn anchor(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn read_string(path: &Path) -> Result<String, KubeconfigError> {
    std::fs::read_to_string(path).map_err(|e| KubeconfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, KubeconfigError> {
    std::fs::read(path).map_err(|e| KubeconfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
