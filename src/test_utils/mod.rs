//! Test utilities.
//!
//! This module provides:
//! - In-memory implementations of every port
//! - Test data factories with override closures
//! - A builder for `AppState` backed by the in-memory ports

mod app_state_builder;
mod factories;
mod mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use mocks::*;
