//! CLI command handling
//!
//! Dispatches CLI commands: runs the catalog against a target and renders
//! the aggregate report, or lists the catalog.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::{Config, Error, Result};
use crate::scenario::{
    run_scenario, Catalog, Outcome, PlatformGate, RunContext, Scenario, ScenarioReport,
};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            target,
            frontend,
            config,
            scenarios,
            json,
        } => run(target, frontend.as_deref(), config.as_deref(), &scenarios, json).await,
        Commands::List => list(),
    }
}

async fn run(
    target: PathBuf,
    frontend: Option<&Path>,
    config_path: Option<&Path>,
    selected: &[String],
    json: bool,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let frontend = config.resolve_frontend(frontend)?;
    let gate = PlatformGate::detect();
    let catalog = Catalog::build(&target);

    let scenarios = select(&catalog, selected)?;

    tracing::info!(
        frontend = %frontend.display(),
        target = %target.display(),
        count = scenarios.len(),
        "starting conformance run"
    );

    let ctx = RunContext {
        frontend: &frontend,
        config: &config,
        gate: &gate,
        quiet: json,
    };

    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        reports.push(run_scenario(scenario, &ctx).await);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_summary(&reports);
    }

    let failed = reports
        .iter()
        .filter(|r| r.outcome == Outcome::Failed)
        .count();
    let unexpected = reports
        .iter()
        .filter(|r| r.outcome == Outcome::UnexpectedSuccess)
        .count();

    if failed + unexpected > 0 {
        return Err(Error::ScenariosFailed { failed, unexpected });
    }
    Ok(())
}

/// Resolve `--scenario` selections against the catalog, preserving
/// catalog order; an empty selection means everything.
fn select<'a>(catalog: &'a Catalog, selected: &[String]) -> Result<Vec<&'a Scenario>> {
    if selected.is_empty() {
        return Ok(catalog.scenarios().iter().collect());
    }

    for name in selected {
        if catalog.get(name).is_none() {
            return Err(Error::UnknownScenario(name.clone()));
        }
    }
    Ok(catalog
        .scenarios()
        .iter()
        .filter(|s| selected.iter().any(|name| name == s.name))
        .collect())
}

fn print_summary(reports: &[ScenarioReport]) {
    println!("\n{}", "Summary:".blue().bold());
    for report in reports {
        let label = match report.outcome {
            Outcome::Passed => "passed".green(),
            Outcome::Failed => "failed".red(),
            Outcome::Skipped => "skipped".yellow(),
            Outcome::ExpectedFailure => "expected failure".yellow(),
            Outcome::UnexpectedSuccess => "unexpected success".red(),
        };
        println!("  {:<24} {}", report.name, label);

        if let Some(failure) = &report.failure {
            println!("    command:    {}", failure.command.dimmed());
            if let Some(pattern) = &failure.pattern {
                println!("    pattern:    {}", pattern.dimmed());
            }
            println!("    diagnostic: {}", failure.diagnostic.dimmed());
        }
        if let Some(reason) = &report.skip_reason {
            println!("    reason:     {}", reason.dimmed());
        }
    }
}

fn list() -> Result<()> {
    // the catalog shape does not depend on the target path
    let catalog = Catalog::build(Path::new("<target>"));

    println!("{}", "Scenario catalog:".blue().bold());
    for scenario in catalog.scenarios() {
        // pad before coloring so the ANSI codes don't skew the column
        println!(
            "  {} {}",
            format!("{:<24}", scenario.name).white().bold(),
            scenario.description.dimmed()
        );
    }
    Ok(())
}
