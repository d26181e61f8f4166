// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! kscan core
//!
//! Resolves cluster resources, loads policy-as-code rules, applies every rule
//! to every matching resource and classifies the outcomes into a report.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Pipeline:** resolve → load → apply → classify

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
