//! End-to-end tests for the conformance harness
//!
//! These tests drive the real sequencer/engine/session stack against the
//! mock MI front-end binary, so every assertion exercises a live child
//! process and its output stream.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mi_harness::common::Config;
use mi_harness::expect::{Expectation, ExpectationEngine};
use mi_harness::scenario::{
    run_scenario, Catalog, Gate, GatePredicate, Outcome, Platform, PlatformGate, PlatformInfo,
    RunContext, Scenario, Step,
};
use mi_harness::session::Session;
use mi_harness::Error;

fn mock_frontend() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_mi"))
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.timeouts.expect_secs = 5;
    config.timeouts.scenario_secs = 30;
    config
}

fn gate_on(platform: Platform) -> PlatformGate {
    PlatformGate::new(PlatformInfo { platform })
}

async fn run_catalog_scenario(name: &str, platform: Platform) -> mi_harness::ScenarioReport {
    let frontend = mock_frontend();
    let config = test_config();
    let gate = gate_on(platform);
    let catalog = Catalog::build(Path::new("/work/a.out"));
    let scenario = catalog.get(name).expect("scenario exists");

    let ctx = RunContext {
        frontend: &frontend,
        config: &config,
        gate: &gate,
        quiet: true,
    };
    run_scenario(scenario, &ctx).await
}

#[tokio::test]
async fn abort_scenario_passes_against_mock() {
    let report = run_catalog_scenario("exec-abort", Platform::Linux).await;
    assert_eq!(report.outcome, Outcome::Passed, "{:?}", report.failure);
    assert_eq!(report.steps_run, report.steps_total);
}

#[tokio::test]
async fn argument_round_trip_scenario_passes_against_mock() {
    let report = run_catalog_scenario("exec-arguments-set", Platform::Linux).await;
    assert_eq!(report.outcome, Outcome::Passed, "{:?}", report.failure);
}

#[tokio::test]
async fn argument_reset_scenario_passes_against_mock() {
    let report = run_catalog_scenario("exec-arguments-reset", Platform::Linux).await;
    assert_eq!(report.outcome, Outcome::Passed, "{:?}", report.failure);
}

#[tokio::test]
async fn step_over_scenarios_pass_against_mock() {
    for name in ["exec-next", "exec-next-instruction"] {
        let report = run_catalog_scenario(name, Platform::Linux).await;
        assert_eq!(report.outcome, Outcome::Passed, "{name}: {:?}", report.failure);
    }
}

#[tokio::test]
async fn step_into_and_finish_scenarios_pass_against_mock() {
    for name in ["exec-step", "exec-finish"] {
        let report = run_catalog_scenario(name, Platform::Linux).await;
        assert_eq!(report.outcome, Outcome::Passed, "{name}: {:?}", report.failure);
    }
}

#[tokio::test]
async fn instruction_step_into_is_skipped_off_darwin_and_passes_on_it() {
    let report = run_catalog_scenario("exec-step-instruction", Platform::Linux).await;
    assert_eq!(report.outcome, Outcome::Skipped);
    assert!(report.skip_reason.unwrap().contains("Darwin"));
    assert_eq!(report.steps_run, 0);

    let report = run_catalog_scenario("exec-step-instruction", Platform::MacOs).await;
    assert_eq!(report.outcome, Outcome::Passed, "{:?}", report.failure);
}

#[tokio::test]
async fn freebsd_skip_gate_prevents_execution() {
    let report = run_catalog_scenario("exec-abort", Platform::FreeBsd).await;
    assert_eq!(report.outcome, Outcome::Skipped);
    assert!(report.skip_reason.unwrap().contains("llvm.org/pr22411"));
}

#[tokio::test]
async fn failing_step_stops_the_scenario_and_records_diagnostics() {
    let frontend = mock_frontend();
    let mut config = test_config();
    config.timeouts.expect_secs = 1;
    let gate = gate_on(Platform::Linux);

    let scenario = Scenario {
        name: "argc-mismatch",
        description: "argc deliberately asserted wrong",
        gates: Vec::new(),
        steps: vec![
            Step::new("-file-exec-and-symbols /work/a.out", vec![Expectation::matches(r"\^done")]),
            Step::new("-break-insert -f main", vec![Expectation::matches(r"\^done,bkpt")]),
            Step::new(
                "-exec-run",
                vec![
                    Expectation::matches(r"\^running"),
                    Expectation::matches(r#"\*stopped,reason="breakpoint-hit""#),
                ],
            ),
            // wrong on purpose: no arguments were configured, argc is 1
            Step::new(
                "-data-evaluate-expression argc",
                vec![Expectation::matches(r#"\^done,value="99""#)],
            ),
            Step::new("-exec-abort", vec![Expectation::matches(r"\^done")]),
        ],
    };

    let ctx = RunContext {
        frontend: &frontend,
        config: &config,
        gate: &gate,
        quiet: true,
    };
    let report = run_scenario(&scenario, &ctx).await;

    assert_eq!(report.outcome, Outcome::Failed);
    // the abort step after the failure was never executed
    assert_eq!(report.steps_run, 3);
    assert_eq!(report.steps_total, 5);

    let failure = report.failure.unwrap();
    assert_eq!(failure.command, "-data-evaluate-expression argc");
    assert_eq!(failure.pattern.as_deref(), Some(r#"\^done,value="99""#));
    assert!(failure.diagnostic.contains("value=\"1\""), "{}", failure.diagnostic);
}

#[tokio::test]
async fn expected_failure_gate_reclassifies_outcomes() {
    let frontend = mock_frontend();
    let config = test_config();
    let gate = gate_on(Platform::Linux);

    let gates = vec![Gate::ExpectedFailureIf {
        predicate: GatePredicate::Always,
        reason: "known broken",
    }];

    let passing = Scenario {
        name: "gated-pass",
        description: "passes while gated",
        gates: gates.clone(),
        steps: vec![Step::new(
            "-file-exec-and-symbols /work/a.out",
            vec![Expectation::matches(r"\^done")],
        )],
    };
    let failing = Scenario {
        name: "gated-fail",
        description: "fails while gated",
        gates,
        steps: vec![Step::new(
            "-file-exec-and-symbols /work/a.out",
            vec![Expectation::matches(r"\^never").within(Duration::from_millis(300))],
        )],
    };

    let ctx = RunContext {
        frontend: &frontend,
        config: &config,
        gate: &gate,
        quiet: true,
    };

    let report = run_scenario(&passing, &ctx).await;
    assert_eq!(report.outcome, Outcome::UnexpectedSuccess);
    assert_eq!(report.gate_reason.as_deref(), Some("known broken"));

    let report = run_scenario(&failing, &ctx).await;
    assert_eq!(report.outcome, Outcome::ExpectedFailure);
    // reclassification never hides the underlying diagnostic
    assert!(report.failure.is_some());
}

#[tokio::test]
async fn session_closed_fails_an_outstanding_wait() {
    let mut session = Session::spawn(&mock_frontend(), &[], &[]).unwrap();
    let mut engine = ExpectationEngine::new(Duration::from_secs(5));

    session.send("-gdb-exit").await.unwrap();
    engine
        .expect(&mut session, &Expectation::matches(r"\^exit"))
        .await
        .unwrap();

    let err = engine
        .expect(&mut session, &Expectation::matches("anything-else"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));
}

#[tokio::test]
async fn timeout_diagnostic_carries_the_unmatched_tail() {
    let mut session = Session::spawn(&mock_frontend(), &[], &[]).unwrap();
    let mut engine = ExpectationEngine::new(Duration::from_millis(500));

    session.send("-exec-arguments x").await.unwrap();
    let err = engine
        .expect(&mut session, &Expectation::matches("does-not-appear"))
        .await
        .unwrap_err();

    match err {
        Error::ExpectationTimeout { tail, .. } => assert!(tail.contains("^done"), "{tail}"),
        other => panic!("expected timeout, got {other:?}"),
    }
    session.terminate(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn wrong_record_class_is_reported_as_protocol_error() {
    let mut session = Session::spawn(&mock_frontend(), &[], &[]).unwrap();
    let mut engine = ExpectationEngine::new(Duration::from_millis(500));

    // no inferior: the front-end answers ^error where ^done is awaited
    session.send("-data-evaluate-expression argc").await.unwrap();
    let err = engine
        .expect(&mut session, &Expectation::matches(r#"\^done,value="1""#))
        .await
        .unwrap_err();

    match err {
        Error::ProtocolError { message, .. } => {
            assert!(message.contains("Invalid process"), "{message}")
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
    session.terminate(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn expectations_never_match_before_an_earlier_match_end() {
    let mut session = Session::spawn(&mock_frontend(), &[], &[]).unwrap();
    let mut engine = ExpectationEngine::new(Duration::from_secs(5));

    session.send("-file-exec-and-symbols /work/a.out").await.unwrap();
    session.send("-break-insert -f main").await.unwrap();
    session.send("-exec-run").await.unwrap();

    // three ^done/^running records are produced; awaiting the stop first
    // moves the cursor past all of them
    engine
        .expect(
            &mut session,
            &Expectation::matches(r#"\*stopped,reason="breakpoint-hit""#),
        )
        .await
        .unwrap();

    let err = engine
        .expect(
            &mut session,
            &Expectation::matches(r"\^running").within(Duration::from_millis(300)),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::ExpectationTimeout { .. }),
        "earlier text must not satisfy a later expectation: {err:?}"
    );
    session.terminate(Duration::from_millis(100)).await;
}
