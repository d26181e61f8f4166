// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cluster Access Ports
//!
//! Traits the resolver and the violations use case talk to. The reqwest
//! implementation lives in `infrastructure::kube`; tests supply in-memory
//! fakes.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Read-only cluster API seam (get, list, discovery)

use crate::domain::errors::ScanError;
use crate::domain::resource::{ResolvedResource, ResourceLocator};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("API returned status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Filters for a collection list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get(
        &self,
        locator: &ResourceLocator,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResolvedResource, ApiError>;

    /// Every item of the collection, all pages followed
    async fn list(
        &self,
        locator: &ResourceLocator,
        options: &ListOptions,
    ) -> Result<Vec<ResolvedResource>, ApiError>;

    /// Group versions served for `group`. An empty list means the group is absent.
    async fn api_group_versions(&self, group: &str) -> Result<Vec<String>, ApiError>;
}

/// Where the target-cluster credential comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialSource {
    /// Per-request override, wins over everything else
    Explicit(PathBuf),
    #[default]
    Default,
}

impl CredentialSource {
    pub fn from_override(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(path) if !path.is_empty() => Self::Explicit(PathBuf::from(path)),
            _ => Self::Default,
        }
    }
}

#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &CredentialSource,
    ) -> Result<Arc<dyn ClusterApi>, ScanError>;
}
