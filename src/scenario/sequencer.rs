//! Scenario execution
//!
//! Drives one scenario against one freshly spawned session: send a
//! command, await its expectations in declared order, stop at the first
//! failure. Execution is strictly sequential and single-threaded per
//! session; a new command is never issued while an expectation is
//! outstanding. The whole dialogue runs under one coarse timeout, and
//! teardown is attempted on every exit path.

use std::path::Path;

use colored::Colorize;

use crate::common::{Config, Error};
use crate::expect::ExpectationEngine;
use crate::scenario::{Outcome, PlatformGate, Scenario, ScenarioReport, StepFailure};
use crate::session::Session;

/// Everything a scenario run needs besides the scenario itself.
pub struct RunContext<'a> {
    /// Front-end executable under test
    pub frontend: &'a Path,
    pub config: &'a Config,
    pub gate: &'a PlatformGate,
    /// Suppress per-step progress output (used by `--json`)
    pub quiet: bool,
}

/// Execute one scenario to a terminal outcome.
pub async fn run_scenario(scenario: &Scenario, ctx: &RunContext<'_>) -> ScenarioReport {
    if !ctx.quiet {
        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        println!("  {}", scenario.description.dimmed());
    }

    if let Some(reason) = ctx.gate.skip_reason(&scenario.gates) {
        if !ctx.quiet {
            println!("  {} {}", "skipped:".yellow(), reason.dimmed());
        }
        return ScenarioReport::skipped(scenario, reason);
    }

    let mut report = execute(scenario, ctx).await;

    let (outcome, gate_reason) = ctx.gate.reclassify(&scenario.gates, report.outcome);
    report.outcome = outcome;
    report.gate_reason = gate_reason;

    if !ctx.quiet {
        print_outcome(&report);
    }
    report
}

/// Spawn, drive, and tear down; returns a raw `Passed`/`Failed` report.
async fn execute(scenario: &Scenario, ctx: &RunContext<'_>) -> ScenarioReport {
    let steps_total = scenario.steps.len();
    let env = ctx.config.frontend.env_pairs();

    let mut session = match Session::spawn(ctx.frontend, &ctx.config.frontend.args, &env) {
        Ok(session) => session,
        Err(e) => {
            return ScenarioReport {
                name: scenario.name.to_string(),
                outcome: Outcome::Failed,
                steps_run: 0,
                steps_total,
                skip_reason: None,
                gate_reason: None,
                failure: Some(StepFailure {
                    command: "<spawn>".to_string(),
                    pattern: None,
                    diagnostic: e.to_string(),
                }),
            };
        }
    };

    let mut engine = ExpectationEngine::new(ctx.config.expect_timeout());
    let mut steps_run = 0;
    let driven = tokio::time::timeout(
        ctx.config.scenario_timeout(),
        drive(scenario, ctx, &mut session, &mut engine, &mut steps_run),
    )
    .await;

    // Teardown happens regardless of how the dialogue ended.
    session.terminate(ctx.config.terminate_grace()).await;

    let failure = match driven {
        Ok(result) => result,
        Err(_) => Some(StepFailure {
            command: "<scenario>".to_string(),
            pattern: None,
            diagnostic: Error::ScenarioTimeout(ctx.config.timeouts.scenario_secs).to_string(),
        }),
    };

    ScenarioReport {
        name: scenario.name.to_string(),
        outcome: if failure.is_none() {
            Outcome::Passed
        } else {
            Outcome::Failed
        },
        steps_run,
        steps_total,
        skip_reason: None,
        gate_reason: None,
        failure,
    }
}

/// Run the step loop, counting completed steps through `steps_run` so the
/// tally survives a scenario-timeout cancellation. Returns the first
/// failure, if any; remaining steps are not executed.
async fn drive(
    scenario: &Scenario,
    ctx: &RunContext<'_>,
    session: &mut Session,
    engine: &mut ExpectationEngine,
    steps_run: &mut usize,
) -> Option<StepFailure> {
    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        if let Err(e) = session.send(&step.command).await {
            return Some(fail_step(ctx, step_num, &step.command, None, &e));
        }

        for exp in &step.expectations {
            if let Err(e) = engine.expect(session, exp).await {
                return Some(fail_step(ctx, step_num, &step.command, Some(&exp.pattern), &e));
            }
        }

        *steps_run = step_num;
        if !ctx.quiet {
            println!(
                "  {} Step {}: {}",
                "✓".green(),
                step_num,
                step.command.dimmed()
            );
        }
    }

    None
}

fn fail_step(
    ctx: &RunContext<'_>,
    step_num: usize,
    command: &str,
    pattern: Option<&str>,
    error: &Error,
) -> StepFailure {
    if !ctx.quiet {
        println!("  {} Step {}: {}", "✗".red(), step_num, error);
    }
    tracing::debug!(step = step_num, command, %error, "step failed");
    StepFailure {
        command: command.to_string(),
        pattern: pattern.map(str::to_string),
        diagnostic: error.to_string(),
    }
}

fn print_outcome(report: &ScenarioReport) {
    match report.outcome {
        Outcome::Passed => println!("  {}", "passed".green().bold()),
        Outcome::Failed => println!(
            "  {} ({}/{} steps completed)",
            "failed".red().bold(),
            report.steps_run,
            report.steps_total
        ),
        Outcome::ExpectedFailure => {
            let reason = report.gate_reason.as_deref().unwrap_or("");
            println!("  {} {}", "expected failure:".yellow(), reason.dimmed())
        }
        Outcome::UnexpectedSuccess => {
            let reason = report.gate_reason.as_deref().unwrap_or("");
            println!("  {} {}", "UNEXPECTED SUCCESS:".red().bold(), reason.dimmed())
        }
        Outcome::Skipped => {}
    }
}
