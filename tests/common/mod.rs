#![allow(unused_imports, dead_code)]
//! Shared test utilities for integration tests.
//!
//! This module provides common functionality used across test files to keep
//! contract declarations and fault assertions in one place.
//!
//! # Modules
//!
//! - `fixtures`: the `Probe` contract and the value types its operations
//!   carry
//! - `helpers`: fault-catching assertions for the panic channel

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::{probe, Kind, Point, Probe, ProbeProxy, RejectedArgument, Unavailable};
pub use helpers::{expect_fault, expect_unstubbed};
