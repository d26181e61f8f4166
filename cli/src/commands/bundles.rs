// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! List the curated policy bundles

use anyhow::Result;
use colored::Colorize;

use kscan_core::infrastructure::bundles::{self, ALL_BUNDLES};
use kscan_core::infrastructure::policy_loader::PolicyLoader;

pub async fn handle_command(verbose: bool) -> Result<()> {
    println!("{}", "Policy bundles:".bold());
    println!("  {} {}", format!("{:<28}", ALL_BUNDLES).bold(), "every bundle below".dimmed());

    let loader = PolicyLoader::new();
    for bundle in bundles::BUNDLES {
        println!("  {} {}", format!("{:<28}", bundle.key).bold(), bundle.description);
        if verbose {
            for policy in loader.load(bundle.key)? {
                println!(
                    "      - {} ({} rules, {})",
                    policy.name,
                    policy.rules.len(),
                    policy.failure_action
                );
            }
        }
    }
    Ok(())
}
