// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Rendering of command results

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use kscan_core::domain::report::{ReportResult, ReportStatus, ReportSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored
    #[default]
    Text,
    Json,
    Yaml,
}

pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML"),
        OutputFormat::Json | OutputFormat::Text => {
            serde_json::to_string_pretty(value).context("Failed to render JSON")
        }
    }
}

fn status_label(status: ReportStatus) -> colored::ColoredString {
    let label = format!("{:<5}", status.to_string().to_uppercase());
    match status {
        ReportStatus::Fail | ReportStatus::Error => label.red().bold(),
        ReportStatus::Warn => label.yellow().bold(),
        ReportStatus::Pass => label.green(),
        ReportStatus::Skip => label.dimmed(),
    }
}

/// One line per result: status, resource, policy/rule, then the message
pub fn format_result_line(result: &ReportResult) -> String {
    let resource = match &result.resource {
        Some(r) if r.namespace.is_empty() => format!("{}/{}", r.kind, r.name),
        Some(r) => format!("{}/{}/{}", r.namespace, r.kind, r.name),
        None => "-".to_string(),
    };
    format!(
        "{} {} {}/{}: {}",
        status_label(result.status),
        resource,
        result.policy,
        result.rule,
        result.message
    )
}

pub fn print_results(results: &[ReportResult]) {
    if results.is_empty() {
        println!("{}", "✓ No violations found".green());
        return;
    }
    for result in results {
        println!("{}", format_result_line(result));
    }
}

pub fn print_summary(summary: &ReportSummary) {
    println!();
    println!(
        "{} {} fail, {} error, {} warn, {} pass, {} skip",
        "Summary:".bold(),
        summary.fail.to_string().red(),
        summary.error.to_string().red(),
        summary.warn.to_string().yellow(),
        summary.pass.to_string().green(),
        summary.skip
    );
}
