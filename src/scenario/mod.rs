//! Scenario data model
//!
//! A scenario is a named, fixed script of command/expectation steps plus
//! the gating predicates evaluated around its execution. Scenarios are
//! constructed once at catalog build time and executed once per run.

pub mod catalog;
pub mod gate;
pub mod sequencer;

pub use catalog::Catalog;
pub use gate::{Gate, GatePredicate, Platform, PlatformGate, PlatformInfo};
pub use sequencer::{run_scenario, RunContext};

use serde::Serialize;

use crate::expect::Expectation;

/// One command and the expectations awaited, in order, after sending it.
#[derive(Debug, Clone)]
pub struct Step {
    pub command: String,
    pub expectations: Vec<Expectation>,
}

impl Step {
    pub fn new(command: impl Into<String>, expectations: Vec<Expectation>) -> Self {
        Self {
            command: command.into(),
            expectations,
        }
    }

    /// A command issued without awaiting anything, for behavior the
    /// protocol currently leaves unspecified.
    pub fn unchecked(command: impl Into<String>) -> Self {
        Self::new(command, Vec::new())
    }
}

/// A named ordered sequence of steps plus gating predicates.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub gates: Vec<Gate>,
    pub steps: Vec<Step>,
}

/// Terminal outcome of one scenario. Exactly one of these is reached per
/// execution; all five are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    ExpectedFailure,
    UnexpectedSuccess,
}

impl Outcome {
    /// Whether this outcome should fail the aggregate run.
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::Failed | Self::UnexpectedSuccess)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::ExpectedFailure => write!(f, "expected failure"),
            Self::UnexpectedSuccess => write!(f, "unexpected success"),
        }
    }
}

/// Diagnostic for the first failed step of a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    /// The command whose expectation failed
    pub command: String,
    /// The expectation pattern, when the failure happened inside a wait
    pub pattern: Option<String>,
    /// Human-readable diagnostic including the unmatched buffer tail
    pub diagnostic: String,
}

/// Result of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    pub steps_run: usize,
    pub steps_total: usize,
    /// Why the scenario was skipped, when it was
    pub skip_reason: Option<String>,
    /// The gate reason behind an `ExpectedFailure`/`UnexpectedSuccess`
    pub gate_reason: Option<String>,
    pub failure: Option<StepFailure>,
}

impl ScenarioReport {
    pub fn skipped(scenario: &Scenario, reason: String) -> Self {
        Self {
            name: scenario.name.to_string(),
            outcome: Outcome::Skipped,
            steps_run: 0,
            steps_total: scenario.steps.len(),
            skip_reason: Some(reason),
            gate_reason: None,
            failure: None,
        }
    }
}
