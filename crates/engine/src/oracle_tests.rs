use super::*;
use fleetd_adapters::oracle::FakeOracleRunner;
use fleetd_core::FakeClock;

fn gateway(runner: FakeOracleRunner) -> OracleGateway<FakeOracleRunner, FakeClock> {
    OracleGateway::new(runner, FakeClock::new(0), 2)
}

#[tokio::test]
async fn decodes_clean_json() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: r#"{"action":"none"}"#.to_string(),
        exit_code: 0,
    });
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    assert!(matches!(outcome, OracleOutcome::Decoded(_)));
}

#[tokio::test]
async fn strips_markdown_code_fence() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "```json\n{\"action\":\"none\"}\n```".to_string(),
        exit_code: 0,
    });
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    assert!(matches!(outcome, OracleOutcome::Decoded(_)));
}

#[tokio::test]
async fn extracts_balanced_json_from_prose() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "Sure, here's my answer: {\"action\": \"none\", \"note\": \"a { b } c\"} thanks!"
            .to_string(),
        exit_code: 0,
    });
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    match outcome {
        OracleOutcome::Decoded(value) => assert_eq!(value["action"], "none"),
        other => panic!("expected Decoded, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_text_is_parse_failed() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "I cannot help with that.".to_string(),
        exit_code: 0,
    });
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    assert!(matches!(outcome, OracleOutcome::ParseFailed { .. }));
}

#[tokio::test]
async fn nonzero_exit_is_runtime_failure() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "panic: out of memory".to_string(),
        exit_code: 1,
    });
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    assert!(matches!(outcome, OracleOutcome::Runtime { exit_code: 1, .. }));
}

#[tokio::test]
async fn timeout_passes_through() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::TimedOut);
    let gw = gateway(runner);
    let outcome = gw.query(OracleInvocation::decision("hi")).await;
    assert!(matches!(outcome, OracleOutcome::Timeout));
}

#[tokio::test]
async fn open_breaker_rejects_before_running() {
    let runner = FakeOracleRunner::new();
    let gw = gateway(runner.clone());
    let mut invocation = OracleInvocation::decision("hi");
    invocation.allowed_tools = vec!["flaky-tool".to_string()];

    for _ in 0..fleetd_core::DEFAULT_FAILURE_THRESHOLD {
        gw.breakers().record_failure("flaky-tool", 0);
    }

    let outcome = gw.query(invocation).await;
    assert!(matches!(outcome, OracleOutcome::Unavailable));
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn success_resets_breaker() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: r#"{"ok":true}"#.to_string(),
        exit_code: 0,
    });
    let gw = gateway(runner);
    gw.breakers().record_failure("tool-a", 0);
    gw.breakers().record_success("tool-a");

    let mut invocation = OracleInvocation::decision("hi");
    invocation.allowed_tools = vec!["tool-a".to_string()];
    let outcome = gw.query(invocation).await;
    assert!(matches!(outcome, OracleOutcome::Decoded(_)));
}
