use super::*;
use fleetd_adapters::health::FakeHealthTransport;
use fleetd_core::{RestartBudget, ServiceKind};

fn http_service(name: &str, interval_ms: u64) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        kind: ServiceKind::Http {
            url: format!("http://{name}.local"),
        },
        interval_ms,
        timeout_ms: 1_000,
    }
}

fn process_service(name: &str, label: &str) -> ServiceDefinition {
    ServiceDefinition {
        name: name.to_string(),
        kind: ServiceKind::Process {
            launch_label: label.to_string(),
        },
        interval_ms: 0,
        timeout_ms: 1_000,
    }
}

#[test]
fn validate_rejects_self_referential_registry() {
    let services = vec![process_service("fleetd", "com.example.fleetd")];
    let result = ServiceRegistry::validate(services, "com.example.fleetd");
    assert!(matches!(result, Err(ConfigError::SelfReferential(_))));
}

#[test]
fn validate_accepts_registry_without_own_label() {
    let services = vec![process_service("other", "com.example.other")];
    assert!(ServiceRegistry::validate(services, "com.example.fleetd").is_ok());
}

#[tokio::test]
async fn check_all_skips_service_before_its_interval_elapses() {
    let transport = FakeHealthTransport::new();
    transport.set_http("http://api.local", true);
    let registry = ServiceRegistry::validate(vec![http_service("api", 60_000)], "self").unwrap();
    let mut monitor = HealthMonitor::new(transport, HealthConfig::default());

    let first = monitor.check_all(&registry, AutonomyLevel::Observe, 0).await;
    assert_eq!(first.results.len(), 1);

    let second = monitor.check_all(&registry, AutonomyLevel::Observe, 1_000).await;
    assert!(second.results.is_empty());

    let third = monitor.check_all(&registry, AutonomyLevel::Observe, 61_000).await;
    assert_eq!(third.results.len(), 1);
}

#[tokio::test]
async fn urgent_alert_fires_once_at_threshold_crossing() {
    let transport = FakeHealthTransport::new();
    transport.set_http("http://api.local", false);
    let registry = ServiceRegistry::validate(vec![http_service("api", 0)], "self").unwrap();
    let mut monitor = HealthMonitor::new(transport, HealthConfig::default());

    let mut alerts_per_tick = Vec::new();
    for tick in 0..5 {
        let result = monitor
            .check_all(&registry, AutonomyLevel::Observe, tick * 1_000)
            .await;
        alerts_per_tick.push(result.urgent_alerts.len());
    }

    // threshold default is 3: only the 3rd consecutive failure alerts.
    assert_eq!(alerts_per_tick, vec![0, 0, 1, 0, 0]);
}

#[tokio::test]
async fn correlated_failure_suppresses_restarts() {
    let transport = FakeHealthTransport::new();
    transport.set_process("a", false);
    transport.set_process("b", false);
    transport.set_process("c", false);
    let registry = ServiceRegistry::validate(
        vec![
            process_service("a", "com.example.a"),
            process_service("b", "com.example.b"),
            process_service("c", "com.example.c"),
        ],
        "self",
    )
    .unwrap();
    let mut monitor = HealthMonitor::new(transport.clone(), HealthConfig::default());

    let tick = monitor.check_all(&registry, AutonomyLevel::Full, 0).await;

    assert!(tick.correlated_failure.is_some());
    assert!(tick.restarts.is_empty());
    assert!(transport.restarted_processes().is_empty());
}

#[tokio::test]
async fn restarts_a_down_restartable_service_under_full_autonomy() {
    let transport = FakeHealthTransport::new();
    transport.set_process("worker", false);
    let registry =
        ServiceRegistry::validate(vec![process_service("worker", "com.example.worker")], "self")
            .unwrap();
    let mut monitor = HealthMonitor::new(transport.clone(), HealthConfig::default());

    let tick = monitor.check_all(&registry, AutonomyLevel::Full, 0).await;

    assert_eq!(tick.restarts, vec![("worker".to_string(), RestartVerdict::Restarted)]);
    assert_eq!(transport.restarted_processes(), vec!["com.example.worker".to_string()]);
}

#[tokio::test]
async fn skips_restart_when_autonomy_too_low() {
    let transport = FakeHealthTransport::new();
    transport.set_process("worker", false);
    let registry =
        ServiceRegistry::validate(vec![process_service("worker", "com.example.worker")], "self")
            .unwrap();
    let mut monitor = HealthMonitor::new(transport.clone(), HealthConfig::default());

    let tick = monitor.check_all(&registry, AutonomyLevel::Cautious, 0).await;

    assert_eq!(
        tick.restarts,
        vec![("worker".to_string(), RestartVerdict::SkippedAutonomyTooLow)]
    );
    assert!(transport.restarted_processes().is_empty());
}

#[tokio::test]
async fn restart_budget_caps_restarts_per_hour() {
    let transport = FakeHealthTransport::new();
    transport.set_process("worker", false);
    let registry =
        ServiceRegistry::validate(vec![process_service("worker", "com.example.worker")], "self")
            .unwrap();
    let config = HealthConfig {
        restart_budget: RestartBudget { max_per_hour: 1 },
        ..HealthConfig::default()
    };
    let mut monitor = HealthMonitor::new(transport.clone(), config);

    let first = monitor.check_all(&registry, AutonomyLevel::Full, 0).await;
    assert_eq!(first.restarts[0].1, RestartVerdict::Restarted);

    let second = monitor.check_all(&registry, AutonomyLevel::Full, 1_000).await;
    assert_eq!(second.restarts[0].1, RestartVerdict::SkippedBudgetExhausted);
    assert_eq!(transport.restarted_processes().len(), 1);
}

#[tokio::test]
async fn does_not_restart_a_non_restartable_kind() {
    let transport = FakeHealthTransport::new();
    transport.set_http("http://api.local", false);
    let registry = ServiceRegistry::validate(vec![http_service("api", 0)], "self").unwrap();
    let mut monitor = HealthMonitor::new(transport.clone(), HealthConfig::default());

    let tick = monitor.check_all(&registry, AutonomyLevel::Full, 0).await;

    assert_eq!(
        tick.restarts,
        vec![("api".to_string(), RestartVerdict::SkippedNotRestartable)]
    );
}
