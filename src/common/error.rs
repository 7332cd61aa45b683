//! Error types for the conformance harness
//!
//! The taxonomy mirrors the ways a scenario can go wrong: the front-end
//! would not start, a pattern never showed up, the front-end died mid-wait,
//! or the protocol answered with the wrong record class.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("Failed to spawn front-end '{program}': {reason}")]
    SpawnFailure { program: String, reason: String },

    #[error("Front-end closed its output stream while waiting for /{pattern}/; unmatched tail: {tail:?}")]
    SessionClosed { pattern: String, tail: String },

    #[error("Failed to write to front-end stdin: {0}")]
    SendFailed(#[source] io::Error),

    // === Expectation Errors ===
    #[error("Timed out after {seconds}s waiting for /{pattern}/; unmatched tail: {tail:?}")]
    ExpectationTimeout {
        pattern: String,
        seconds: u64,
        tail: String,
    },

    #[error("Forbidden pattern /{pattern}/ matched: {matched:?}")]
    ForbiddenMatch { pattern: String, matched: String },

    #[error("Protocol answered with the wrong record class for /{pattern}/: {message}")]
    ProtocolError { pattern: String, message: String },

    #[error("Invalid expectation pattern /{pattern}/: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === Scenario Errors ===
    #[error("Scenario exceeded its overall timeout of {0}s")]
    ScenarioTimeout(u64),

    #[error("Unknown scenario '{0}'. Use 'mi-harness list' to see the catalog")]
    UnknownScenario(String),

    #[error("{failed} scenario(s) failed, {unexpected} unexpectedly succeeded")]
    ScenariosFailed { failed: usize, unexpected: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Front-end executable '{name}' not found on PATH. Install it or set frontend.path")]
    FrontendNotFound { name: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a spawn failure error
    pub fn spawn_failure(program: &str, reason: impl ToString) -> Self {
        Self::SpawnFailure {
            program: program.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a protocol error carrying the literal message text of the
    /// offending record
    pub fn protocol(pattern: &str, message: &str) -> Self {
        Self::ProtocolError {
            pattern: pattern.to_string(),
            message: message.to_string(),
        }
    }

    /// True when the error fails one scenario but the harness itself is
    /// healthy (every expectation-level failure).
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            Self::SessionClosed { .. }
                | Self::ExpectationTimeout { .. }
                | Self::ForbiddenMatch { .. }
                | Self::ProtocolError { .. }
        )
    }
}
