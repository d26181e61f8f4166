// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Apply policy sources to explicit resource queries

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use kscan_core::domain::apply::{ApplyRequest, ApplyResponse};
use kscan_core::domain::resource::ResourceQuery;

use crate::context::ScanContext;
use crate::output::{render, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// Policy file, directory or bundle key (repeatable)
    #[arg(short, long = "policy", value_name = "SOURCE")]
    pub policies: Vec<String>,

    /// Read a complete ApplyRequest (JSON or YAML) instead of flags
    #[arg(long, value_name = "FILE", conflicts_with_all = ["policies", "kind"])]
    pub request: Option<PathBuf>,

    /// Resource apiVersion
    #[arg(long, default_value = "v1")]
    pub api_version: String,

    /// Resource kind, e.g. Pod or Deployment
    #[arg(long)]
    pub kind: Option<String>,

    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Fetch a single named resource
    #[arg(long)]
    pub name: Option<String>,

    #[arg(short = 'l', long)]
    pub label_selector: Option<String>,

    #[arg(long)]
    pub field_selector: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

impl ApplyArgs {
    /// Build the request from `--request` or from the query flags
    pub fn to_request(&self, kubeconfig: Option<&str>) -> Result<ApplyRequest> {
        let mut request = match &self.request {
            Some(path) => read_request(path)?,
            None => {
                let mut query = ResourceQuery::new(
                    self.api_version.clone(),
                    self.kind.clone().unwrap_or_default(),
                );
                if let Some(ns) = &self.namespace {
                    query = query.in_namespace(ns.clone());
                }
                if let Some(name) = &self.name {
                    query = query.named(name.clone());
                }
                if let Some(selector) = &self.label_selector {
                    query = query.with_label_selector(selector.clone());
                }
                if let Some(selector) = &self.field_selector {
                    query = query.with_field_selector(selector.clone());
                }
                ApplyRequest {
                    policy_sources: self.policies.clone(),
                    resource_queries: vec![query],
                    target_credential: None,
                }
            }
        };
        if request.target_credential.is_none() {
            request.target_credential = kubeconfig.map(str::to_string);
        }
        Ok(request)
    }
}

fn read_request(path: &Path) -> Result<ApplyRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Invalid ApplyRequest in {:?}", path))
}

pub async fn handle_command(args: ApplyArgs, ctx: &ScanContext) -> Result<()> {
    let request = args.to_request(ctx.kubeconfig.as_deref())?;
    let response = ctx
        .apply
        .apply(&request, &CancellationToken::new())
        .await
        .context("Apply failed")?;

    match args.output {
        OutputFormat::Text => print_text(&response),
        format => println!("{}", render(&response, format)?),
    }
    Ok(())
}

fn print_text(response: &ApplyResponse) {
    println!(
        "{}",
        format!("{} resources evaluated", response.resources.len()).bold()
    );
    for result in &response.results {
        let resource = &result.resource;
        println!();
        println!(
            "{} {} {}",
            result.policy.bold(),
            format!("({})", result.validation_failure_action).dimmed(),
            format!("{}/{}/{}", resource.namespace, resource.kind, resource.name).cyan()
        );
        for rule in &result.rules {
            println!(
                "  {:<5} {} [{}] {}",
                rule.status.as_str(),
                rule.name,
                rule.kind,
                rule.message
            );
        }
    }
}
