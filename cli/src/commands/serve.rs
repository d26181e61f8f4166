// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP tool server

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use kscan_core::presentation::api;

use crate::context::ScanContext;

pub async fn handle_command(ctx: &ScanContext, host: Option<String>, port: Option<u16>) -> Result<()> {
    let server = &ctx.config.spec.server;
    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| server.bind_address.clone()),
        port.unwrap_or(server.port)
    );

    let shutdown = CancellationToken::new();
    let app = api::app(Arc::new(ctx.catalog()), shutdown.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Tool server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("HTTP server failed")?;

    info!("Tool server shut down");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels in-flight tool calls
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
    shutdown.cancel();
}
