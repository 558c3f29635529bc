use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{BuildOptions, Pipeline};
use crate::server::{ProcessController, Prober, StartOptions, is_running};
use crate::watch::session::{WatchSession, WatchState};
use notify::{RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Watches the source tree and turns bursts of change events into single
/// rebuild cycles: stop, build (skipping tests), deploy, start.
///
/// Failures inside a cycle are logged and the session keeps watching, so a
/// later change can retry. The orchestrator runs until the process exits;
/// there is no stop command.
pub struct WatchOrchestrator {
    config: Config,
    controller: Arc<ProcessController>,
    pipeline: Arc<dyn Pipeline>,
    prober: Arc<dyn Prober>,
    session: WatchSession,
    run_options: StartOptions,
}

impl WatchOrchestrator {
    /// Creates an orchestrator in the idle state.
    ///
    /// `run_options` are the options the initial run used; every restart
    /// inside a rebuild cycle reuses them unchanged.
    pub fn new(
        config: Config,
        controller: Arc<ProcessController>,
        pipeline: Arc<dyn Pipeline>,
        prober: Arc<dyn Prober>,
        run_options: StartOptions,
        debounce: Duration,
    ) -> Self {
        let session = WatchSession::new(config.watch_patterns.clone(), debounce);
        Self {
            config,
            controller,
            pipeline,
            prober,
            session,
            run_options,
        }
    }

    /// Attaches a filesystem watcher to `<repoRoot>/src` and runs the
    /// debounce loop until the event stream ends.
    ///
    /// # Errors
    ///
    /// Only watcher *setup* failures surface here. Once watching, errors
    /// reported by the underlying filesystem observer are logged and ignored,
    /// and rebuild-cycle failures never escape the loop.
    #[tracing::instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for path in event.paths {
                        // Receiver gone means we are shutting down
                        let _ = tx.send(path);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Filesystem watcher error"),
            }
        })
        .map_err(|e| Error::Watch(format!("failed to create watcher: {}", e)))?;

        let watch_root = self.config.repo_root.join("src");
        watcher
            .watch(&watch_root, RecursiveMode::Recursive)
            .map_err(|e| {
                Error::Watch(format!("failed to watch {}: {}", watch_root.display(), e))
            })?;

        tracing::info!(root = %watch_root.display(), "Watching for source changes");
        self.drive(rx).await;
        Ok(())
    }

    /// Runs the debounce loop over an explicit stream of changed paths.
    ///
    /// Separated from [`run`](Self::run) so the loop can be driven without a
    /// real filesystem watcher. Returns when the sender side is dropped.
    pub async fn drive(mut self, mut rx: mpsc::UnboundedReceiver<PathBuf>) {
        loop {
            let event = match self.session.deadline() {
                // Idle: nothing armed, wait for the next change
                None => rx.recv().await,
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    match tokio::time::timeout_at(deadline, rx.recv()).await {
                        Ok(event) => event,
                        Err(_) => {
                            // Quiet period elapsed
                            self.fire().await;
                            continue;
                        }
                    }
                }
            };

            match event {
                Some(path) if self.session.matches(&path) => {
                    tracing::debug!(path = %path.display(), state = ?self.session.state(), "Change event");
                    self.session.note_change(Instant::now());
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    /// Handles an expired deadline: runs one rebuild cycle unless one is
    /// already in progress, in which case the fired cycle is skipped whole.
    async fn fire(&mut self) {
        if !self.session.begin_rebuild() {
            tracing::warn!("Rebuild already in progress, skipping this cycle");
            return;
        }

        match self.rebuild_cycle().await {
            Ok(()) => tracing::info!("Rebuild cycle complete"),
            Err(e) => {
                // Non-fatal to the session: keep watching so the next
                // change can retry
                tracing::warn!(error = %e, "Rebuild cycle failed, still watching");
            }
        }
        self.session.finish_rebuild();
        debug_assert_eq!(self.session.state(), WatchState::Idle);
    }

    /// One full cycle, strictly sequential: stop the running instance and
    /// wait for the port to clear, build without tests, deploy, restart with
    /// the original run options.
    async fn rebuild_cycle(&self) -> Result<()> {
        if is_running(self.prober.as_ref(), &self.config).await {
            self.controller.stop_and_wait().await?;
        }

        self.pipeline
            .build(&BuildOptions { skip_tests: true })
            .await?;
        self.pipeline.deploy().await?;
        self.controller.start(&self.run_options).await
    }
}
