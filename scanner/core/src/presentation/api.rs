// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Tool Surface
//!
//! GET /health, GET /tools and POST /tools/call over the tool catalog.
//! Tool failures are `isError` results with status 200; only malformed JSON
//! bodies are rejected by axum itself.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer
//! - **Purpose:** Axum router over the tool catalog

use crate::presentation::tools::{ToolCall, ToolCatalog, ToolMetadata, ToolResult};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub tools: Arc<ToolCatalog>,
    /// Cancelled on shutdown; each call runs under a child token
    pub shutdown: CancellationToken,
}

pub fn app(tools: Arc<ToolCatalog>, shutdown: CancellationToken) -> Router {
    let state = Arc::new(AppState { tools, shutdown });

    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tools: Vec<ToolMetadata> = state.tools.list();
    Json(json!({ "tools": tools }))
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(call): Json<ToolCall>,
) -> Json<ToolResult> {
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    Json(state.tools.call(call, &cancel).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::apply_service::ApplyService;
    use crate::application::violations_service::ViolationsService;
    use crate::domain::cluster::{ClusterApi, ClusterConnector, CredentialSource};
    use crate::domain::config::ScannerConfigSpec;
    use crate::domain::errors::ScanError;
    use crate::infrastructure::pattern_evaluator::PatternEvaluator;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct Unreachable;

    #[async_trait]
    impl ClusterConnector for Unreachable {
        async fn connect(
            &self,
            _credential: &CredentialSource,
        ) -> Result<Arc<dyn ClusterApi>, ScanError> {
            Err(ScanError::Configuration("no cluster credentials found".to_string()))
        }
    }

    fn router() -> Router {
        let spec = ScannerConfigSpec::default();
        let connector: Arc<dyn ClusterConnector> = Arc::new(Unreachable);
        let tools = ToolCatalog::new(
            Arc::new(ApplyService::new(
                connector.clone(),
                Arc::new(PatternEvaluator::new()),
                &spec,
            )),
            Arc::new(ViolationsService::new(connector, &spec)),
        );
        app(Arc::new(tools), CancellationToken::new())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_list_tools() {
        let response = router()
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_call_failure_is_error_result_not_http_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/tools/call")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "show_violations", "arguments": {"namespace": "default"}}).to_string(),
            ))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["isError"], true);
        assert!(body["text"].as_str().unwrap().contains("no cluster credentials"));
    }
}
