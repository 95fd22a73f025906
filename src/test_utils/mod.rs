//! Test utilities for integration testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations for mocking persistence
//! - A builder for `AppState` wired to those repositories

mod app_state_builder;
mod factories;
mod subscriber_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use subscriber_mocks::*;
