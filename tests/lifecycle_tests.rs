use async_trait::async_trait;
use javactl::config::Config;
use javactl::error::{Error, Result};
use javactl::pipeline::{BuildOptions, Pipeline};
use javactl::{Lifecycle, StartOptions};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Counts build/deploy calls. Deploy always fails so no command ever gets as
/// far as launching a server.
#[derive(Default)]
struct CountingPipeline {
    builds: AtomicUsize,
    deploys: AtomicUsize,
}

#[async_trait]
impl Pipeline for CountingPipeline {
    async fn build(&self, _options: &BuildOptions) -> Result<()> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn deploy(&self) -> Result<()> {
        self.deploys.fetch_add(1, Ordering::SeqCst);
        Err(Error::Deploy("stub ends the command here".to_string()))
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn lifecycle_with(pipeline: Arc<CountingPipeline>) -> (tempfile::TempDir, Lifecycle) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::new(dir.path());
    // Keep the liveness check away from anything actually listening
    config.http_port = free_port();
    let lifecycle = Lifecycle::new(config).unwrap().with_pipeline(pipeline);
    (dir, lifecycle)
}

#[tokio::test]
async fn test_print_only_run_never_builds_or_deploys() {
    let pipeline = Arc::new(CountingPipeline::default());
    let (_dir, lifecycle) = lifecycle_with(Arc::clone(&pipeline));

    // The foreground invocation itself may fail (no jar, maybe no JVM);
    // what matters is that the rebuild pre-steps never ran
    let _ = lifecycle
        .run(&StartOptions::new(vec!["-v".to_string()]))
        .await;

    assert_eq!(pipeline.builds.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.deploys.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_print_only_watch_never_builds_or_deploys() {
    let pipeline = Arc::new(CountingPipeline::default());
    let (_dir, lifecycle) = lifecycle_with(Arc::clone(&pipeline));

    let _ = lifecycle
        .watch(
            &StartOptions::new(vec!["-t".to_string()]),
            Duration::from_millis(100),
        )
        .await;

    assert_eq!(pipeline.builds.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.deploys.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_normal_run_reaches_the_pipeline() {
    let pipeline = Arc::new(CountingPipeline::default());
    let (_dir, lifecycle) = lifecycle_with(Arc::clone(&pipeline));

    let err = lifecycle.run(&StartOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::Deploy(_)));
    assert_eq!(pipeline.builds.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.deploys.load(Ordering::SeqCst), 1);
}
