//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Test fixtures
//! - An in-memory Consul
//! - API test client

#![allow(dead_code)]


pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
