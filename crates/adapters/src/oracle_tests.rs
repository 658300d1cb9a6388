use super::fake::FakeOracleRunner;
use super::*;

#[tokio::test]
async fn fake_runner_returns_queued_results_in_order() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "{}".to_string(),
        exit_code: 0,
    });
    runner.push_result(OracleRawResult::TimedOut);

    let first = runner.run(&OracleInvocation::decision("think")).await;
    assert!(matches!(first, OracleRawResult::Completed { .. }));

    let second = runner.run(&OracleInvocation::decision("think again")).await;
    assert!(matches!(second, OracleRawResult::TimedOut));
}

#[tokio::test]
async fn fake_runner_records_invocations() {
    let runner = FakeOracleRunner::new();
    runner.push_result(OracleRawResult::Completed {
        stdout: "{}".to_string(),
        exit_code: 0,
    });
    runner.run(&OracleInvocation::decision("scan the fleet")).await;

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].prompt, "scan the fleet");
}

#[tokio::test]
async fn unconfigured_fake_reports_unavailable() {
    let runner = FakeOracleRunner::new();
    let result = runner.run(&OracleInvocation::decision("think")).await;
    assert!(matches!(result, OracleRawResult::Unavailable { .. }));
}
