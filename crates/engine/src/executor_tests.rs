use super::*;
use fleetd_storage::FsStateWriter;
use parking_lot::Mutex as PLMutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
struct FakeTarget {
    live: PLMutex<HashSet<String>>,
    blocked: PLMutex<HashSet<String>>,
    free_memory_mb: AtomicU32,
    started: PLMutex<Vec<String>>,
    stopped: PLMutex<Vec<String>>,
    restarted: PLMutex<Vec<String>>,
    notified: PLMutex<Vec<(String, NotificationTier, String)>>,
}

impl FakeTarget {
    fn new() -> Self {
        let target = Self::default();
        target.free_memory_mb.store(8192, Ordering::SeqCst);
        target
    }
}

#[async_trait]
impl ExecutionTarget for FakeTarget {
    async fn session_is_live(&self, project: &str) -> bool {
        self.live.lock().contains(project)
    }
    async fn live_session_count(&self) -> u32 {
        self.live.lock().len() as u32
    }
    async fn free_memory_mb(&self) -> u64 {
        self.free_memory_mb.load(Ordering::SeqCst) as u64
    }
    async fn project_blocked(&self, project: &str) -> bool {
        self.blocked.lock().contains(project)
    }
    async fn start_session(&self, project: &str, _prompt: Option<String>) -> Result<(), ExecuteError> {
        self.live.lock().insert(project.to_string());
        self.started.lock().push(project.to_string());
        Ok(())
    }
    async fn stop_session(&self, project: &str) -> Result<(), ExecuteError> {
        self.live.lock().remove(project);
        self.stopped.lock().push(project.to_string());
        Ok(())
    }
    async fn restart_session(&self, project: &str, _prompt: Option<String>) -> Result<(), ExecuteError> {
        self.live.lock().insert(project.to_string());
        self.restarted.lock().push(project.to_string());
        Ok(())
    }
    async fn send_notification(
        &self,
        project: &str,
        tier: NotificationTier,
        text: String,
    ) -> Result<(), ExecuteError> {
        self.notified.lock().push((project.to_string(), tier, text));
        Ok(())
    }
}

fn known(projects: &[&str]) -> HashSet<String> {
    projects.iter().map(|s| s.to_string()).collect()
}

fn executor(
    target: FakeTarget,
    config: DecisionExecutorConfig,
) -> DecisionExecutor<FakeTarget, FsStateWriter> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::mem::forget(dir);
    let state = ProcessStateStore::load(path).unwrap();
    DecisionExecutor::new(config, target, Arc::new(Mutex::new(state)))
}

fn start_rec(project: &str) -> Recommendation {
    Recommendation {
        project: project.to_string(),
        action: ActionKind::Start,
        reason: "idle".to_string(),
        priority: 3,
        prompt: None,
        confidence: None,
        notification_tier: None,
    }
}

#[test]
fn unknown_project_is_rejected() {
    let exec = executor(FakeTarget::new(), DecisionExecutorConfig::default());
    let decisions = exec.evaluate(vec![start_rec("ghost")], &known(&["real"]), 0);
    assert!(!decisions[0].validated);
}

#[test]
fn protected_project_is_rejected() {
    let mut cfg = DecisionExecutorConfig::default();
    cfg.protected_projects.insert("sacred".to_string());
    let exec = executor(FakeTarget::new(), cfg);
    let decisions = exec.evaluate(vec![start_rec("sacred")], &known(&["sacred"]), 0);
    assert!(!decisions[0].validated);
}

#[test]
fn observe_autonomy_downgrades_to_observe_only() {
    let exec = executor(FakeTarget::new(), DecisionExecutorConfig::default());
    let decisions = exec.evaluate(vec![start_rec("p1")], &known(&["p1"]), 0);
    assert!(decisions[0].validated);
    assert!(decisions[0].observe_only);
}

#[tokio::test]
async fn full_autonomy_executes_start() {
    let exec = executor(FakeTarget::new(), DecisionExecutorConfig::default());
    exec.state
        .lock()
        .with_state(|s| {
            s.runtime_autonomy_level = AutonomyLevel::Full;
        })
        .unwrap();

    let decisions = exec.evaluate(vec![start_rec("p1")], &known(&["p1"]), 0);
    assert!(!decisions[0].observe_only);
    let outcome = exec.execute(&decisions[0], 0).await;
    assert!(matches!(outcome, ExecutionOutcome::Executed));
}

#[tokio::test]
async fn start_rejected_when_session_already_live() {
    let target = FakeTarget::new();
    target.live.lock().insert("p1".to_string());
    let exec = executor(target, DecisionExecutorConfig::default());
    exec.state
        .lock()
        .with_state(|s| {
            s.runtime_autonomy_level = AutonomyLevel::Full;
        })
        .unwrap();

    let decisions = exec.evaluate(vec![start_rec("p1")], &known(&["p1"]), 0);
    let outcome = exec.execute(&decisions[0], 0).await;
    assert!(matches!(outcome, ExecutionOutcome::Rejected { .. }));
}

#[tokio::test]
async fn error_retry_cap_downgrades_restart_to_notify() {
    let exec = executor(
        FakeTarget::new(),
        DecisionExecutorConfig {
            max_error_retries: 1,
            ..Default::default()
        },
    );
    exec.state
        .lock()
        .with_state(|s| {
            s.runtime_autonomy_level = AutonomyLevel::Full;
            s.error_retry_counts.insert("p1".to_string(), 2);
        })
        .unwrap();

    let rec = Recommendation {
        project: "p1".to_string(),
        action: ActionKind::Restart,
        reason: "recovering from error signal".to_string(),
        priority: 4,
        prompt: None,
        confidence: None,
        notification_tier: None,
    };
    let decisions = exec.evaluate(vec![rec], &known(&["p1"]), 0);
    let outcome = exec.execute(&decisions[0], 0).await;
    assert!(matches!(outcome, ExecutionOutcome::Executed));
    assert!(exec.target.restarted.lock().is_empty());
    assert_eq!(exec.target.notified.lock().len(), 1);
}

#[tokio::test]
async fn cooldown_blocks_repeated_same_action_after_execution() {
    let exec = executor(FakeTarget::new(), DecisionExecutorConfig::default());
    exec.state
        .lock()
        .with_state(|s| {
            s.runtime_autonomy_level = AutonomyLevel::Full;
        })
        .unwrap();
    let known_set = known(&["p1"]);

    let first = exec.evaluate(vec![start_rec("p1")], &known_set, 0);
    exec.execute(&first[0], 0).await;

    let second = exec.evaluate(vec![start_rec("p1")], &known_set, 100);
    assert!(!second[0].validated);
}
