// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # kscan
//!
//! Policy compliance scanner for Kubernetes clusters.
//!
//! ## Commands
//!
//! - `kscan serve` - HTTP tool surface for assistants
//! - `kscan apply` - Apply policy sources to explicit resource queries
//! - `kscan scan` - Scan a namespace with a curated policy bundle
//! - `kscan violations` - Show violations from stored policy reports
//! - `kscan bundles` - List curated policy bundles
//! - `kscan config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use kscan_cli::commands::{self, ApplyArgs, ConfigCommand, ScanArgs, ViolationsArgs};
use kscan_cli::context::ScanContext;
use kscan_core::domain::config::ScannerConfig;

/// kscan - Kubernetes policy compliance scanner
#[derive(Parser)]
#[command(name = "kscan")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long, global = true, env = "KSCAN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Kubeconfig for the target cluster, overrides configured credentials
    #[arg(long, global = true, value_name = "FILE")]
    kubeconfig: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the assistant tool surface over HTTP
    #[command(name = "serve")]
    Serve {
        /// Bind address (default: spec.server.bind_address)
        #[arg(long)]
        host: Option<String>,

        /// Port (default: spec.server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Apply policies to resource queries
    #[command(name = "apply")]
    Apply(ApplyArgs),

    /// Scan with a curated policy bundle
    #[command(name = "scan")]
    Scan(ScanArgs),

    /// Show violations from stored policy reports
    #[command(name = "violations")]
    Violations(ViolationsArgs),

    /// List curated policy bundles
    #[command(name = "bundles")]
    Bundles {
        /// List the policies of each bundle
        #[arg(short, long)]
        verbose: bool,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands report their own load errors
    if let Some(Commands::Config { command }) = cli.command {
        init_logging(cli.log_level.as_deref().unwrap_or("info"), "compact")?;
        return commands::config::handle_command(command, cli.config).await;
    }

    let config =
        ScannerConfig::load_or_default(cli.config.clone()).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.spec.logging.level.clone());
    init_logging(&level, &config.spec.logging.format)?;

    let ctx = ScanContext::new(config, cli.kubeconfig.clone());

    match cli.command {
        Some(Commands::Serve { host, port }) => commands::serve::handle_command(&ctx, host, port).await,
        Some(Commands::Apply(args)) => commands::apply::handle_command(args, &ctx).await,
        Some(Commands::Scan(args)) => commands::scan::handle_command(args, &ctx).await,
        Some(Commands::Violations(args)) => commands::violations::handle_command(args, &ctx).await,
        Some(Commands::Bundles { verbose }) => commands::bundles::handle_command(verbose).await,
        Some(Commands::Config { .. }) => Ok(()),
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
