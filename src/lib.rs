//! mi-harness - conformance testing for MI-style debugger front-ends
//!
//! Spawns a debugger front-end in interpreter mode, drives it through
//! scripted command sequences, and verifies that asynchronous textual
//! output matches expected patterns in order, within time bounds, and
//! under per-platform known-issue exemptions.

pub mod cli;
pub mod commands;
pub mod common;
pub mod expect;
pub mod scenario;
pub mod session;

// Re-export commonly used types for tests
pub use common::{Config, Error, Result};
pub use expect::{Expectation, ExpectationEngine, OutputBuffer};
pub use scenario::{Catalog, Outcome, PlatformGate, Scenario, ScenarioReport, Step};
pub use session::Session;
