// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scanner Configuration Types
//!
//! Kubernetes-style manifest (apiVersion/kind/metadata/spec) for kscan:
//! - Default credential for the target cluster
//! - Resolution behaviour (empty namespace handling, fan-out, page size)
//! - Policy source loading (recursive directories)
//! - Evaluation fan-out
//! - Report classification defaults (audit downgrade, excluded namespaces)
//! - HTTP tool surface and logging
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Scanner configuration manifest and discovery

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_API_VERSION: &str = "kscan.dev/v1";
pub const CONFIG_KIND: &str = "ScannerConfig";

/// Top-level scanner configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// API version (must be "kscan.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ScannerConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ScannerConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfigSpec {
    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub policies: PolicyConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Kubeconfig used when a request carries no credential override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,

    /// Context to use instead of the kubeconfig's current-context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// What an empty query namespace means for namespaced kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyNamespace {
    /// List across every namespace the credential can read
    #[default]
    AllNamespaces,
    /// Substitute `resolution.default_namespace`
    DefaultNamespace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub empty_namespace: EmptyNamespace,

    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Queries resolved in parallel per request
    #[serde(default = "default_resolution_concurrency")]
    pub concurrency: usize,

    /// `limit` sent on list calls
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            empty_namespace: EmptyNamespace::default(),
            default_namespace: default_namespace(),
            concurrency: default_resolution_concurrency(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Descend into sub-directories of directory policy sources
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Resource x policy pairs evaluated in parallel
    #[serde(default = "default_evaluation_concurrency")]
    pub concurrency: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            concurrency: default_evaluation_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Downgrade scored failures of audit-mode policies to warn
    #[serde(default)]
    pub audit_warn: bool,

    #[serde(default = "default_excluded_namespaces")]
    pub excluded_namespaces: Vec<String>,

    /// Value of `source` on every report result
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            audit_warn: false,
            excluded_namespaces: default_excluded_namespaces(),
            source: default_source(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("compact" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_request_timeout() -> u64 {
    30
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_resolution_concurrency() -> usize {
    4
}

fn default_page_size() -> u32 {
    500
}

fn default_evaluation_concurrency() -> usize {
    8
}

fn default_excluded_namespaces() -> Vec<String> {
    vec!["kube-system".to_string(), "kyverno".to_string()]
}

fn default_source() -> String {
    crate::domain::report::DEFAULT_SOURCE.to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ManifestMetadata {
                name: "kscan".to_string(),
                labels: None,
            },
            spec: ScannerConfigSpec::default(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. KSCAN_CONFIG_PATH environment variable
    /// 2. ./kscan-config.yaml (working directory)
    /// 3. ~/.kscan/config.yaml (user home)
    /// 4. /etc/kscan/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KSCAN_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./kscan-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".kscan").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/kscan/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path fails hard when missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(&config_path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", config_path, e)
            })?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KSCAN_KUBECONFIG") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: KSCAN_KUBECONFIG={}", val);
                self.spec.cluster.kubeconfig = Some(val);
            }
        }

        if let Ok(val) = std::env::var("KSCAN_LOG_LEVEL") {
            if !val.trim().is_empty() {
                self.spec.logging.level = val;
            }
        }

        if let Ok(val) = std::env::var("KSCAN_AUDIT_WARN") {
            match parse_bool(&val) {
                Some(flag) => {
                    tracing::info!("Environment override: KSCAN_AUDIT_WARN={}", flag);
                    self.spec.report.audit_warn = flag;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for KSCAN_AUDIT_WARN: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != CONFIG_API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                CONFIG_API_VERSION
            );
        }

        if self.kind != CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.cluster.request_timeout_seconds == 0 {
            anyhow::bail!("spec.cluster.request_timeout_seconds must be greater than zero");
        }

        if self.spec.resolution.concurrency == 0 {
            anyhow::bail!("spec.resolution.concurrency must be greater than zero");
        }

        if self.spec.resolution.page_size == 0 {
            anyhow::bail!("spec.resolution.page_size must be greater than zero");
        }

        if self.spec.resolution.empty_namespace == EmptyNamespace::DefaultNamespace
            && self.spec.resolution.default_namespace.trim().is_empty()
        {
            anyhow::bail!(
                "spec.resolution.default_namespace cannot be empty when empty_namespace is default-namespace"
            );
        }

        if self.spec.evaluation.concurrency == 0 {
            anyhow::bail!("spec.evaluation.concurrency must be greater than zero");
        }

        if self.spec.report.source.trim().is_empty() {
            anyhow::bail!("spec.report.source cannot be empty");
        }

        match self.spec.logging.format.as_str() {
            "compact" | "json" => {}
            other => anyhow::bail!(
                "Invalid spec.logging.format: '{}'. Must be 'compact' or 'json'",
                other
            ),
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
