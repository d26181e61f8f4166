// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Presentation
//!
//! The tool catalog and its HTTP surface.
//!
//! # Architecture
//!
//! - **Layer:** Presentation Layer

pub mod api;
pub mod tools;

pub use tools::{ToolCall, ToolCatalog, ToolResult};
