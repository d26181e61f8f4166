// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource Resolver
//!
//! Turns resource queries into fetched cluster documents.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Query → locator → single GET or filtered, paginated list
//! - **Integration:** `ResourceQuery` → locator table → `ClusterApi`
//!
//! Every query is mapped before any network call, so an unmapped kind fails
//! the request without touching the cluster. Queries then run with bounded
//! concurrency; each writes its own result slot and the slots are flattened
//! in input order. The first failing query aborts the whole call.

use crate::domain::cluster::{ApiError, ClusterApi, ClusterConnector, CredentialSource, ListOptions};
use crate::domain::config::{EmptyNamespace, ResolutionConfig};
use crate::domain::errors::ScanError;
use crate::domain::resource::{ResolvedResource, ResourceLocator, ResourceQuery};
use crate::infrastructure::locator_table;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct ResourceResolver {
    connector: Arc<dyn ClusterConnector>,
    resolution: ResolutionConfig,
}

struct PlannedQuery<'a> {
    index: usize,
    query: &'a ResourceQuery,
    locator: ResourceLocator,
    namespace: Option<String>,
}

impl ResourceResolver {
    pub fn new(connector: Arc<dyn ClusterConnector>, resolution: ResolutionConfig) -> Self {
        Self {
            connector,
            resolution,
        }
    }

    /// Resolve every query against the cluster selected by `credential`.
    ///
    /// Results keep input order and are not deduplicated: overlapping
    /// queries yield overlapping resources.
    pub async fn resolve(
        &self,
        queries: &[ResourceQuery],
        credential: &CredentialSource,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedResource>, ScanError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let planned = queries
            .iter()
            .enumerate()
            .map(|(index, query)| self.plan(index, query))
            .collect::<Result<Vec<_>, _>>()?;

        let api = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled("resource resolution".to_string())),
            api = self.connector.connect(credential) => api?,
        };

        let fetch_all = async {
            let mut slots: Vec<Option<Vec<ResolvedResource>>> = vec![None; planned.len()];
            let pending: Vec<_> = planned
                .iter()
                .map(|plan| {
                    let api = Arc::clone(&api);
                    async move { (plan.index, fetch(api.as_ref(), plan).await) }
                })
                .collect();
            let mut fetches =
                stream::iter(pending).buffer_unordered(self.resolution.concurrency.max(1));

            while let Some((index, result)) = fetches.next().await {
                slots[index] = Some(result?);
            }
            Ok::<_, ScanError>(slots)
        };

        let slots = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ScanError::Cancelled("resource resolution".to_string()));
            }
            slots = fetch_all => slots.map_err(|e| {
                error!(error = %e, "Resource resolution aborted");
                e
            })?,
        };

        let resources: Vec<ResolvedResource> = slots.into_iter().flatten().flatten().collect();
        metrics::counter!("kscan_resources_resolved_total").increment(resources.len() as u64);
        info!(
            queries = queries.len(),
            resources = resources.len(),
            "Resolved resources"
        );
        Ok(resources)
    }

    fn plan<'a>(&self, index: usize, query: &'a ResourceQuery) -> Result<PlannedQuery<'a>, ScanError> {
        if query.kind.trim().is_empty() {
            return Err(ScanError::Configuration(format!(
                "query #{} has no kind ({})",
                index, query
            )));
        }
        let entry = locator_table::lookup(query.effective_api_version(), &query.kind);
        let locator = locator_table::locate(query)?;

        let namespace = match query.namespace() {
            Some(ns) => Some(ns.to_string()),
            None => match self.resolution.empty_namespace {
                EmptyNamespace::AllNamespaces => None,
                EmptyNamespace::DefaultNamespace => entry
                    .filter(|e| e.namespaced)
                    .map(|_| self.resolution.default_namespace.clone()),
            },
        };

        Ok(PlannedQuery {
            index,
            query,
            locator,
            namespace,
        })
    }
}

async fn fetch(api: &dyn ClusterApi, plan: &PlannedQuery<'_>) -> Result<Vec<ResolvedResource>, ScanError> {
    let query = plan.query;
    let namespace = plan.namespace.as_deref();

    match query.name() {
        Some(name) => {
            debug!(query_index = plan.index, kind = %query.kind, name, namespace, "Fetching named resource");
            let resource = api.get(&plan.locator, namespace, name).await.map_err(|e| match e {
                ApiError::NotFound(_) => ScanError::NotFound {
                    kind: query.kind.clone(),
                    name: name.to_string(),
                    namespace: namespace.map(str::to_string),
                },
                other => transport_error(plan, other),
            })?;
            Ok(vec![resource])
        }
        None => {
            let options = ListOptions {
                namespace: namespace.map(str::to_string),
                label_selector: query.label_selector().map(str::to_string),
                field_selector: query.field_selector().map(str::to_string),
            };
            debug!(query_index = plan.index, kind = %query.kind, namespace, "Listing resources");
            let resources = api
                .list(&plan.locator, &options)
                .await
                .map_err(|e| transport_error(plan, e))?;
            debug!(query_index = plan.index, count = resources.len(), "Listed resources");
            Ok(resources)
        }
    }
}

fn transport_error(plan: &PlannedQuery<'_>, err: ApiError) -> ScanError {
    ScanError::transport(
        format!("resolving query #{} ({}) via {}", plan.index, plan.query, plan.locator),
        err.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeCluster {
        objects: Vec<ResolvedResource>,
        calls: Mutex<Vec<String>>,
    }

    fn pod(namespace: &str, name: &str, app: &str) -> ResolvedResource {
        ResolvedResource::new(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": name, "namespace": namespace, "labels": {"app": app}}
        }))
    }

    fn namespace_object(name: &str) -> ResolvedResource {
        ResolvedResource::new(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": name}
        }))
    }

    fn kind_for(locator: &ResourceLocator) -> &'static str {
        match locator.resource.as_str() {
            "pods" => "Pod",
            "namespaces" => "Namespace",
            "deployments" => "Deployment",
            _ => "Unknown",
        }
    }

    #[async_trait]
    impl ClusterApi for FakeCluster {
        async fn get(
            &self,
            locator: &ResourceLocator,
            namespace: Option<&str>,
            name: &str,
        ) -> Result<ResolvedResource, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("get {} {:?} {}", locator, namespace, name));
            self.objects
                .iter()
                .find(|o| {
                    o.kind() == kind_for(locator)
                        && o.name() == name
                        && namespace.map_or(true, |ns| o.namespace() == ns)
                })
                .cloned()
                .ok_or_else(|| ApiError::NotFound(name.to_string()))
        }

        async fn list(
            &self,
            locator: &ResourceLocator,
            options: &ListOptions,
        ) -> Result<Vec<ResolvedResource>, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("list {} {:?}", locator, options.namespace));
            // Later pods answer sooner, so unordered completion is exercised
            if locator.resource == "pods" && options.namespace.as_deref() == Some("a") {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            let selector = options.label_selector.as_deref().and_then(|s| s.split_once('='));
            Ok(self
                .objects
                .iter()
                .filter(|o| o.kind() == kind_for(locator))
                .filter(|o| {
                    options
                        .namespace
                        .as_deref()
                        .map_or(true, |ns| o.namespace() == ns)
                })
                .filter(|o| {
                    selector.map_or(true, |(k, v)| {
                        o.labels().get(k).map(String::as_str) == Some(v)
                    })
                })
                .cloned()
                .collect())
        }

        async fn api_group_versions(&self, _group: &str) -> Result<Vec<String>, ApiError> {
            Ok(vec![])
        }
    }

    struct FakeConnector {
        cluster: Arc<FakeCluster>,
        connects: AtomicUsize,
    }

    impl FakeConnector {
        fn new(objects: Vec<ResolvedResource>) -> Arc<Self> {
            Arc::new(Self {
                cluster: Arc::new(FakeCluster {
                    objects,
                    ..Default::default()
                }),
                connects: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ClusterConnector for FakeConnector {
        async fn connect(
            &self,
            _credential: &CredentialSource,
        ) -> Result<Arc<dyn ClusterApi>, ScanError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(self.cluster.clone())
        }
    }

    fn resolver(connector: Arc<FakeConnector>, resolution: ResolutionConfig) -> ResourceResolver {
        ResourceResolver::new(connector, resolution)
    }

    #[tokio::test]
    async fn test_named_query_returns_exactly_one() {
        let connector = FakeConnector::new(vec![pod("default", "test-pod", "web")]);
        let resolver = resolver(connector, ResolutionConfig::default());
        let query = ResourceQuery::new("v1", "Pod")
            .in_namespace("default")
            .named("test-pod");

        let resources = resolver
            .resolve(&[query], &CredentialSource::Default, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name(), "test-pod");
    }

    #[tokio::test]
    async fn test_named_query_missing_is_not_found() {
        let connector = FakeConnector::new(vec![]);
        let resolver = resolver(connector, ResolutionConfig::default());
        let query = ResourceQuery::new("apps/v1", "Deployment")
            .in_namespace("default")
            .named("missing");

        let err = resolver
            .resolve(&[query], &CredentialSource::Default, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ScanError::NotFound { kind, name, namespace } => {
                assert_eq!(kind, "Deployment");
                assert_eq!(name, "missing");
                assert_eq!(namespace.as_deref(), Some("default"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let connector = FakeConnector::new(vec![pod("default", "a", "web")]);
        let resolver = resolver(connector, ResolutionConfig::default());
        let query = ResourceQuery::new("v1", "Pod").with_label_selector("app=db");

        let resources = resolver
            .resolve(&[query], &CredentialSource::Default, &CancellationToken::new())
            .await
            .unwrap();
        assert!(resources.is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_kind_fails_before_connecting() {
        let connector = FakeConnector::new(vec![]);
        let resolver = resolver(connector.clone(), ResolutionConfig::default());
        let queries = vec![
            ResourceQuery::new("v1", "Pod"),
            ResourceQuery::new("example.com/v1", "Widget"),
        ];

        let err = resolver
            .resolve(&queries, &CredentialSource::Default, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
        assert!(err.to_string().contains("Widget"));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_keep_input_order_without_dedup() {
        let connector = FakeConnector::new(vec![
            pod("a", "pod-a", "web"),
            pod("b", "pod-b", "web"),
        ]);
        let resolver = resolver(
            connector,
            ResolutionConfig {
                concurrency: 4,
                ..Default::default()
            },
        );
        let queries = vec![
            ResourceQuery::new("v1", "Pod").in_namespace("a"),
            ResourceQuery::new("v1", "Pod").in_namespace("b"),
            ResourceQuery::new("v1", "Pod").in_namespace("a"),
        ];

        let resources = resolver
            .resolve(&queries, &CredentialSource::Default, &CancellationToken::new())
            .await
            .unwrap();
        let names: Vec<&str> = resources.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["pod-a", "pod-b", "pod-a"]);
    }

    #[tokio::test]
    async fn test_all_namespaces_mode_lists_unscoped() {
        let connector = FakeConnector::new(vec![pod("a", "pod-a", "web"), pod("b", "pod-b", "web")]);
        let resolver = resolver(connector.clone(), ResolutionConfig::default());

        let resources = resolver
            .resolve(
                &[ResourceQuery::new("v1", "Pod")],
                &CredentialSource::Default,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resources.len(), 2);
        let calls = connector.cluster.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["list v1/pods None"]);
    }

    #[tokio::test]
    async fn test_default_namespace_mode_skips_cluster_scoped_kinds() {
        let connector = FakeConnector::new(vec![
            pod("default", "pod-d", "web"),
            pod("other", "pod-o", "web"),
            namespace_object("default"),
        ]);
        let resolution = ResolutionConfig {
            empty_namespace: EmptyNamespace::DefaultNamespace,
            ..Default::default()
        };
        let resolver = resolver(connector.clone(), resolution);

        let resources = resolver
            .resolve(
                &[ResourceQuery::new("v1", "Pod"), ResourceQuery::new("v1", "Namespace")],
                &CredentialSource::Default,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let names: Vec<&str> = resources.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["pod-d", "default"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let connector = FakeConnector::new(vec![pod("a", "pod-a", "web")]);
        let resolver = resolver(connector, ResolutionConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolver
            .resolve(&[ResourceQuery::new("v1", "Pod")], &CredentialSource::Default, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_cancel_during_slow_fetch_discards_finished_queries() {
        let connector = FakeConnector::new(vec![pod("a", "pod-a", "web"), pod("b", "pod-b", "web")]);
        let cluster = connector.cluster.clone();
        let resolver = resolver(connector, ResolutionConfig::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        // Namespace "b" answers at once, "a" is still sleeping when the token fires
        let err = resolver
            .resolve(
                &[
                    ResourceQuery::new("v1", "Pod").in_namespace("b"),
                    ResourceQuery::new("v1", "Pod").in_namespace("a"),
                ],
                &CredentialSource::Default,
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled(_)));
        assert_eq!(cluster.calls.lock().unwrap().len(), 2);
    }
}
