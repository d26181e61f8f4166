// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the kscan CLI

pub mod apply;
pub mod bundles;
pub mod config;
pub mod scan;
pub mod serve;
pub mod violations;

pub use self::apply::ApplyArgs;
pub use self::config::ConfigCommand;
pub use self::scan::ScanArgs;
pub use self::violations::ViolationsArgs;
