//! Common test utilities for engine integration tests
//!
//! This module provides diff fixtures and a driver harness running on
//! paused tokio time.

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod harness;

pub use fixtures::{add_edge, add_node, diff, remove_edge, update_node, KAYAKING_DIFF};
pub use harness::Harness;
