// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Use cases composed from the domain ports and infrastructure adapters.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrate rule application and classify the outcomes

pub mod apply_service;
pub mod classifier;
pub mod orchestrator;
pub mod scan_planner;
pub mod violations_service;

pub use apply_service::{ApplyService, ScanRequest};
pub use classifier::ReportClassifier;
pub use orchestrator::Orchestrator;
pub use violations_service::ViolationsService;
