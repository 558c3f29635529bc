use async_trait::async_trait;
use javactl::config::Config;
use javactl::error::{Error, Result};
use javactl::server::{
    DiscoveredProcess, DiscoveryStrategy, KillOutcome, ProcessController, Prober, StartOptions,
    TcpProber,
};
use mockall::mock;
use std::sync::Arc;
use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

// Mock the liveness seam so the bounded startup wait can be tested without
// binding sockets
mock! {
    pub ProberMock {}

    #[async_trait]
    impl Prober for ProberMock {
        async fn probe(&self, port: u16) -> bool;
    }
}

// Mock discovery so kill scenarios don't depend on real processes
mock! {
    pub DiscoveryMock {}

    impl DiscoveryStrategy for DiscoveryMock {
        fn discover(&self, signature: &str) -> Vec<DiscoveredProcess>;
        fn terminate(&self, process: &DiscoveredProcess) -> Result<()>;
    }
}

fn test_config() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::new(dir.path());
    (dir, config)
}

fn controller(
    config: Config,
    prober: MockProberMock,
    discovery: MockDiscoveryMock,
) -> ProcessController {
    ProcessController::new(config, Arc::new(prober), Arc::new(discovery))
        // Pin the baseline so the ambient environment can't leak into tests
        .with_env_baseline(None)
}

fn fake_process(pid: u32) -> DiscoveredProcess {
    DiscoveredProcess {
        pid,
        name: "java".to_string(),
        cmdline: format!("java -jar /srv/.devserver/devserver.jar --id {}", pid),
    }
}

#[test]
fn test_env_merge_preserves_baseline_without_accumulating() {
    let (_dir, config) = test_config();
    let controller = ProcessController::new(
        config,
        Arc::new(MockProberMock::new()),
        Arc::new(MockDiscoveryMock::new()),
    )
    .with_env_baseline(Some("trace.enabled->true".to_string()));

    let first = controller.compose_overrides();
    let second = controller.compose_overrides();

    // Starting twice in one session yields the same value both times
    assert_eq!(first, "trace.enabled->true;http.port->8080;log.level->info");
    assert_eq!(first, second);
}

#[test]
fn test_env_merge_without_baseline() {
    let (_dir, config) = test_config();
    let controller = controller(config, MockProberMock::new(), MockDiscoveryMock::new());

    assert_eq!(
        controller.compose_overrides(),
        "http.port->8080;log.level->info"
    );
}

#[test]
fn test_env_merge_reflects_debug_mode() {
    let (_dir, mut config) = test_config();
    config.debug_mode = true;
    config.http_port = 9090;
    let controller = controller(config, MockProberMock::new(), MockDiscoveryMock::new());

    assert_eq!(
        controller.compose_overrides(),
        "http.port->9090;log.level->debug"
    );
}

#[test]
fn test_kill_with_no_matches_is_not_an_error() {
    let (_dir, config) = test_config();
    let mut discovery = MockDiscoveryMock::new();
    discovery.expect_discover().returning(|_| Vec::new());

    let controller = controller(config, MockProberMock::new(), discovery);

    let outcome = controller.stop().unwrap();
    assert_eq!(outcome, KillOutcome::NothingToKill);
}

#[test]
fn test_kill_tolerates_partial_signal_failure() {
    let (_dir, config) = test_config();
    let mut discovery = MockDiscoveryMock::new();
    discovery
        .expect_discover()
        .returning(|_| vec![fake_process(101), fake_process(102), fake_process(103)]);
    // The middle process refuses the signal; the other two must still get it
    discovery
        .expect_terminate()
        .times(3)
        .returning(|process| {
            if process.pid == 102 {
                Err(Error::Process("permission denied".to_string()))
            } else {
                Ok(())
            }
        });

    let controller = controller(config, MockProberMock::new(), discovery);

    let outcome = controller.stop().unwrap();
    assert_eq!(
        outcome,
        KillOutcome::Signalled {
            signalled: 2,
            failed: 1
        }
    );
}

#[tokio::test]
async fn test_start_times_out_after_bounded_attempts() {
    let (_dir, config) = test_config();

    let mut prober = MockProberMock::new();
    // 30 attempts, two ports per attempt, then the wait must give up
    prober.expect_probe().times(60).returning(|_| false);

    let controller = controller(config, prober, MockDiscoveryMock::new())
        .with_java_executable("true");

    let err = controller
        .start(&StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StartupTimeout(_)));
}

#[tokio::test]
async fn test_start_succeeds_once_live() {
    let (_dir, config) = test_config();

    let mut prober = MockProberMock::new();
    prober.expect_probe().returning(|_| true);

    let controller = controller(config, prober, MockDiscoveryMock::new())
        .with_java_executable("true");

    controller.start(&StartOptions::default()).await.unwrap();
}

#[tokio::test]
async fn test_repeated_starts_leave_no_zombie_children() {
    let (_dir, config) = test_config();

    let mut prober = MockProberMock::new();
    prober.expect_probe().returning(|_| true);

    let controller = controller(config, prober, MockDiscoveryMock::new())
        .with_java_executable("true");

    for _ in 0..3 {
        controller.start(&StartOptions::default()).await.unwrap();
    }

    // The launcher is reaped synchronously and the server is reparented,
    // so nothing we spawned lingers in our process table
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::new(),
    );
    let me = sysinfo::Pid::from_u32(std::process::id());
    let zombies = system
        .processes()
        .values()
        .filter(|p| p.parent() == Some(me) && p.status() == ProcessStatus::Zombie)
        .count();
    assert_eq!(zombies, 0);
}

#[tokio::test]
async fn test_missing_runtime_is_fatal() {
    let (_dir, config) = test_config();

    // No expectations: a missing runtime must fail before any probe
    let controller = controller(config, MockProberMock::new(), MockDiscoveryMock::new())
        .with_java_executable("/definitely/not/a/jvm/bin/java");

    let err = controller
        .start(&StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RuntimeMissing(_)));
}

#[tokio::test]
async fn test_print_only_skips_supervision() {
    let (_dir, config) = test_config();

    // Print-only runs synchronously in the foreground: no liveness probing,
    // no discovery, and no kill happen at all
    let controller = controller(config, MockProberMock::new(), MockDiscoveryMock::new())
        .with_java_executable("true");

    controller
        .start(&StartOptions::new(vec!["-v".to_string()]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_and_wait_returns_once_port_clears() {
    let (_dir, config) = test_config();

    let mut discovery = MockDiscoveryMock::new();
    discovery.expect_discover().returning(|_| Vec::new());
    let mut prober = MockProberMock::new();
    prober.expect_probe().returning(|_| false);

    let controller = controller(config, prober, discovery);

    let outcome = controller.stop_and_wait().await.unwrap();
    assert_eq!(outcome, KillOutcome::NothingToKill);
}

#[tokio::test]
async fn test_status_reports_endpoint() {
    let (_dir, mut config) = test_config();
    config.http_port = 8081;

    let mut prober = MockProberMock::new();
    prober.expect_probe().returning(|_| false);

    let controller = controller(config, prober, MockDiscoveryMock::new());

    let status = controller.status().await;
    assert!(!status.running);
    assert_eq!(status.port, 8081);
    assert_eq!(status.to_string(), "not running");
}

#[tokio::test]
async fn test_status_reports_running_endpoint() {
    // A real listener on the configured port reads as a live server
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let (_dir, mut config) = test_config();
    config.http_port = port;

    let controller = ProcessController::new(
        config,
        Arc::new(TcpProber),
        Arc::new(MockDiscoveryMock::new()),
    )
    .with_env_baseline(None);

    let status = controller.status().await;
    assert!(status.running);
    assert_eq!(status.to_string(), format!("running at 127.0.0.1:{}", port));
}
