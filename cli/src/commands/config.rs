// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! `show` reports the file actually loaded, or the built-in defaults.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use kscan_core::domain::config::ScannerConfig;

pub const TEMPLATE_MINIMAL: &str = include_str!("../../templates/config-minimal.yaml");
pub const TEMPLATE_WITH_EXAMPLES: &str = include_str!("../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration and where it came from
    Show {
        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Write a starter configuration file
    Generate {
        #[arg(short, long, default_value = "./kscan-config.yaml")]
        output: PathBuf,

        /// Commented template listing every key
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { yaml } => show(config_override, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, as_yaml: bool) -> Result<()> {
    let origin = config_override
        .clone()
        .or_else(ScannerConfig::discover_config)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    let config = ScannerConfig::load_or_default(config_override)
        .context("Failed to load configuration")?;

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
        return Ok(());
    }

    println!("{} {}", "Loaded from:".bold(), origin);
    println!();
    print!("{}", describe(&config));
    Ok(())
}

/// Human-readable summary of the settings the scanner acts on
pub fn describe(config: &ScannerConfig) -> String {
    let spec = &config.spec;
    let rows = [
        (
            "kubeconfig",
            spec.cluster
                .kubeconfig
                .clone()
                .unwrap_or_else(|| "(default chain)".to_string()),
        ),
        (
            "context",
            spec.cluster.context.clone().unwrap_or_else(|| "(current)".to_string()),
        ),
        ("empty namespace", format!("{:?}", spec.resolution.empty_namespace)),
        ("default namespace", spec.resolution.default_namespace.clone()),
        (
            "fan-out",
            format!(
                "resolve {} / evaluate {}",
                spec.resolution.concurrency, spec.evaluation.concurrency
            ),
        ),
        ("recursive sources", spec.policies.recursive.to_string()),
        ("audit as warn", spec.report.audit_warn.to_string()),
        ("excluded namespaces", spec.report.excluded_namespaces.join(", ")),
        ("report source", spec.report.source.clone()),
        (
            "tool server",
            format!("{}:{}", spec.server.bind_address, spec.server.port),
        ),
    ];

    rows.iter()
        .map(|(key, value)| format!("  {:<20} {}\n", key, value))
        .collect()
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ScannerConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        TEMPLATE_WITH_EXAMPLES
    } else {
        TEMPLATE_MINIMAL
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lists_effective_settings() {
        let mut config = ScannerConfig::from_yaml_str(TEMPLATE_MINIMAL).unwrap();
        config.spec.policies.recursive = true;

        let text = describe(&config);
        assert!(text.contains("(default chain)"));
        assert!(text.contains("kube-system, kyverno"));
        assert!(text.lines().any(|line| line.trim_start().starts_with("recursive sources")
            && line.ends_with("true")));
        assert!(text.contains("127.0.0.1:8085"));
    }
}
