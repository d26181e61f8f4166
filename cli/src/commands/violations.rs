// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Show violations from the policy reports stored in the cluster

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use kscan_core::domain::report::parse_namespace_excludes;
use kscan_core::presentation::tools::{DEFAULT_NAMESPACE_EXCLUDE, INSTALL_GUIDANCE};

use crate::context::ScanContext;
use crate::output::{print_results, render, OutputFormat};

#[derive(Args, Debug)]
pub struct ViolationsArgs {
    /// Namespace whose policy reports are read
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Comma-separated namespaces to exclude
    #[arg(long, default_value = DEFAULT_NAMESPACE_EXCLUDE)]
    pub namespace_exclude: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

pub async fn handle_command(args: ViolationsArgs, ctx: &ScanContext) -> Result<()> {
    let excluded = parse_namespace_excludes(&args.namespace_exclude);
    let result = ctx
        .violations
        .show(
            &args.namespace,
            &excluded,
            &ctx.credential(),
            &CancellationToken::new(),
        )
        .await;

    let results = match result {
        Ok(results) => results,
        Err(e) if e.is_capability_missing() => {
            println!("{}", INSTALL_GUIDANCE.yellow());
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read policy reports"),
    };

    match args.output {
        OutputFormat::Text => print_results(&results),
        format => println!("{}", render(&results, format)?),
    }
    Ok(())
}
