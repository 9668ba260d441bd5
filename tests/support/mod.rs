//! Test support module
//!
//! Shared fixtures and helper functions for the integration tests.

pub mod helpers;

// Re-export rstest fixtures for convenient use in tests
pub mod fixtures;
