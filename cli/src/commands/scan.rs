// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scan a namespace with a curated policy bundle

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use kscan_core::application::ScanRequest;
use kscan_core::domain::report::parse_namespace_excludes;

use crate::context::ScanContext;
use crate::output::{print_results, print_summary, render, OutputFormat};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Policy set: all, pod-security, rbac-best-practices, kubernetes-best-practices
    #[arg(short, long, default_value = "all")]
    pub policy_sets: String,

    /// Namespace to scan, `all` for every namespace (default: configured namespace)
    #[arg(short, long, default_value = "")]
    pub namespace: String,

    /// Branch the scanned manifests came from
    #[arg(long, default_value = "main")]
    pub git_branch: String,

    /// Comma-separated namespaces to exclude (default: from configuration)
    #[arg(long)]
    pub namespace_exclude: Option<String>,

    /// Exit with status 2 when any fail or error result remains
    #[arg(long)]
    pub fail_on_violations: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl ScanArgs {
    pub fn to_request(&self, ctx: &ScanContext) -> ScanRequest {
        let excluded_namespaces = match &self.namespace_exclude {
            Some(raw) => parse_namespace_excludes(raw),
            None => ctx
                .config
                .spec
                .report
                .excluded_namespaces
                .iter()
                .cloned()
                .collect(),
        };
        ScanRequest {
            policy_sets: self.policy_sets.clone(),
            namespace: self.namespace.clone(),
            git_branch: self.git_branch.clone(),
            excluded_namespaces,
            target_credential: ctx.kubeconfig.clone(),
        }
    }
}

pub async fn handle_command(args: ScanArgs, ctx: &ScanContext) -> Result<()> {
    let request = args.to_request(ctx);
    let report = ctx
        .apply
        .scan(&request, &CancellationToken::new())
        .await
        .context("Scan failed")?;

    match args.output {
        OutputFormat::Text => {
            println!(
                "{}",
                format!(
                    "Scanned {} resources with {} policies ({})",
                    report.resources, report.policies, report.policy_sets
                )
                .bold()
            );
            println!();
            print_results(&report.results);
            print_summary(&report.summary);
        }
        format => println!("{}", render(&report, format)?),
    }

    if args.fail_on_violations && report.summary.fail + report.summary.error > 0 {
        eprintln!("{}", "Violations found".red());
        std::process::exit(2);
    }
    Ok(())
}
