// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types and the seams the pipeline talks through.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request-scoped data plus the cluster and evaluator interfaces

pub mod apply;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod outcome;
pub mod policy;
pub mod report;
pub mod resource;

pub use errors::ScanError;
