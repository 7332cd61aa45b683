//! Platform-conditional gating
//!
//! Gates are declarative metadata attached to a scenario: a predicate over
//! the environment plus what to do with it. Predicates are pure functions
//! of platform identity, evaluated once at scenario start; they never
//! consult execution state. A skip gate prevents execution entirely; an
//! expected-failure gate reclassifies the outcome afterward without
//! suppressing the underlying diagnostic.

use crate::scenario::Outcome;

/// Operating system identity, reduced to what the gates discriminate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    FreeBsd,
    OtherBsd,
}

/// Environment identity, read once per harness invocation.
#[derive(Debug, Clone, Copy)]
pub struct PlatformInfo {
    pub platform: Platform,
}

impl PlatformInfo {
    /// Detect the current platform.
    pub fn detect() -> Self {
        let platform = match os_info::get().os_type() {
            os_info::Type::Macos => Platform::MacOs,
            os_info::Type::Windows => Platform::Windows,
            os_info::Type::FreeBSD => Platform::FreeBsd,
            os_info::Type::NetBSD | os_info::Type::OpenBSD | os_info::Type::DragonFly => {
                Platform::OtherBsd
            }
            // every other reported type in practice is a Linux distribution
            _ => Platform::Linux,
        };
        Self { platform }
    }
}

/// Predicate over the environment a gate fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePredicate {
    /// Fires everywhere
    Always,
    /// Fires on one platform
    IfPlatform(Platform),
    /// Fires on the platform a tracked known issue afflicts; `reference`
    /// names the issue for the report
    IfKnownIssue {
        platform: Platform,
        reference: &'static str,
    },
}

impl GatePredicate {
    pub fn evaluate(&self, info: &PlatformInfo) -> bool {
        match self {
            Self::Always => true,
            Self::IfPlatform(platform) => info.platform == *platform,
            Self::IfKnownIssue { platform, .. } => info.platform == *platform,
        }
    }

    pub fn known_issue(&self) -> Option<&'static str> {
        match self {
            Self::IfKnownIssue { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// One gating rule attached to a scenario.
#[derive(Debug, Clone)]
pub enum Gate {
    /// Do not execute when the predicate holds
    SkipIf {
        predicate: GatePredicate,
        reason: &'static str,
    },
    /// Do not execute unless the predicate holds
    SkipUnless {
        predicate: GatePredicate,
        reason: &'static str,
    },
    /// Reclassify `Failed` → `ExpectedFailure` and `Passed` →
    /// `UnexpectedSuccess` when the predicate holds
    ExpectedFailureIf {
        predicate: GatePredicate,
        reason: &'static str,
    },
}

fn describe(predicate: &GatePredicate, reason: &str) -> String {
    match predicate.known_issue() {
        Some(reference) => format!("{reason} ({reference})"),
        None => reason.to_string(),
    }
}

/// Evaluates a scenario's gates against the detected environment.
#[derive(Debug, Clone, Copy)]
pub struct PlatformGate {
    info: PlatformInfo,
}

impl PlatformGate {
    pub fn new(info: PlatformInfo) -> Self {
        Self { info }
    }

    pub fn detect() -> Self {
        Self::new(PlatformInfo::detect())
    }

    pub fn platform(&self) -> Platform {
        self.info.platform
    }

    /// Pre-execution check: the reason to skip, if any gate says so.
    pub fn skip_reason(&self, gates: &[Gate]) -> Option<String> {
        for gate in gates {
            match gate {
                Gate::SkipIf { predicate, reason } if predicate.evaluate(&self.info) => {
                    return Some(describe(predicate, reason));
                }
                Gate::SkipUnless { predicate, reason } if !predicate.evaluate(&self.info) => {
                    return Some(describe(predicate, reason));
                }
                _ => {}
            }
        }
        None
    }

    /// The active expected-failure reason, if any gate's predicate holds.
    pub fn expected_failure_reason(&self, gates: &[Gate]) -> Option<String> {
        gates.iter().find_map(|gate| match gate {
            Gate::ExpectedFailureIf { predicate, reason } if predicate.evaluate(&self.info) => {
                Some(describe(predicate, reason))
            }
            _ => None,
        })
    }

    /// Post-execution reclassification of a raw pass/fail outcome.
    pub fn reclassify(&self, gates: &[Gate], outcome: Outcome) -> (Outcome, Option<String>) {
        match self.expected_failure_reason(gates) {
            Some(reason) => match outcome {
                Outcome::Failed => (Outcome::ExpectedFailure, Some(reason)),
                Outcome::Passed => (Outcome::UnexpectedSuccess, Some(reason)),
                other => (other, None),
            },
            None => (outcome, None),
        }
    }
}
