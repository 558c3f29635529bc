/*!
 # javactl

 A CLI for managing the lifecycle of a local Java dev server.

 ## Overview

 javactl provides functionality to:
 - Install a server distribution (cached download + extraction)
 - Build the server via the Gradle wrapper and deploy the artifact
 - Start the server detached and wait for it to become live
 - Kill running instances found by scanning the process table
 - Watch the source tree and rebuild/restart on changes, debounced
 - Report whether the server is currently running

 ## Basic Usage

 ```no_run
 use javactl::{Lifecycle, StartOptions, config::Config};

 #[tokio::main]
 async fn main() -> javactl::Result<()> {
     let config = Config::new("/path/to/devserver-repo");
     let lifecycle = Lifecycle::new(config)?;

     // Full cycle: stop a running instance, build, deploy, start
     lifecycle.run(&StartOptions::default()).await?;

     let status = lifecycle.status().await;
     println!("{}", status);

     Ok(())
 }
 ```

 ## Features

 - **Liveness Probing**: dual-port TCP checks (primary and +1000 debug port)
 - **Process Discovery**: kill by command-line signature, no PID bookkeeping
 - **Debounced Watch**: bursts of changes coalesce into one rebuild cycle
 - **Bounded Waits**: startup and shutdown polling with hard attempt budgets
 - **Async Support**: full async/await on tokio
*/

pub mod config;
pub mod error;
pub mod install;
pub mod pipeline;
pub mod server;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};
pub use install::Installer;
pub use pipeline::{BuildOptions, GradlePipeline, Pipeline};
pub use server::{
    KillOutcome, ProcessController, ProcessScanDiscovery, ServerStatus, StartOptions, TcpProber,
};
pub use watch::WatchOrchestrator;

use server::{OVERRIDES_ENV, is_running};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level façade coordinating the lifecycle components.
///
/// Owns the validated configuration snapshot and the override-environment
/// baseline captured once per CLI session, and dispatches the lifecycle
/// commands: install, build, run, kill, watch, status. Components are
/// constructed fresh from the snapshot for each command, so configuration
/// setters only take effect between commands, never during one.
/// All public methods are instrumented with `tracing` spans.
pub struct Lifecycle {
    /// Configuration snapshot shared with every component.
    config: Config,
    /// `DEVSERVER_OVERRIDES` as it stood when this session began. Every
    /// start within the session merges from this value, never from the
    /// current environment, so directives cannot accumulate across restarts.
    env_baseline: Option<String>,
    /// Build/deploy pipeline override; `None` selects the Gradle pipeline
    /// over the repository root.
    pipeline: Option<Arc<dyn Pipeline>>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("config", &self.config)
            .field("env_baseline", &self.env_baseline)
            .field("pipeline", &self.pipeline.as_ref().map(|_| "dyn Pipeline"))
            .finish()
    }
}

impl Lifecycle {
    /// Creates a lifecycle manager from a configuration file path.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::new(config)
    }

    /// Creates a lifecycle manager, validating the configuration once.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` when the port is out of range or the
    /// repository root does not exist.
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        Ok(Self {
            config,
            env_baseline: std::env::var(OVERRIDES_ENV).ok(),
            pipeline: None,
        })
    }

    /// Replaces the build/deploy pipeline used by `build`, `run`, and
    /// `watch`. Tests substitute a counting stub here the same way the watch
    /// orchestrator takes an injected [`Pipeline`].
    pub fn with_pipeline(mut self, pipeline: Arc<dyn Pipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Overrides the HTTP port. Only called between commands.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigInvalid` for port zero.
    pub fn set_http_port(&mut self, port: u16) -> Result<()> {
        if port == 0 {
            return Err(Error::ConfigInvalid(
                "httpPort must be between 1 and 65535".to_string(),
            ));
        }
        self.config.http_port = port;
        Ok(())
    }

    /// Toggles debug mode. Only called between commands.
    pub fn set_debug_mode(&mut self, debug: bool) {
        self.config.debug_mode = debug;
    }

    fn controller(&self) -> Arc<ProcessController> {
        Arc::new(
            ProcessController::new(
                self.config.clone(),
                Arc::new(TcpProber),
                Arc::new(ProcessScanDiscovery),
            )
            .with_env_baseline(self.env_baseline.clone()),
        )
    }

    fn pipeline(&self) -> Arc<dyn Pipeline> {
        match &self.pipeline {
            Some(pipeline) => Arc::clone(pipeline),
            None => Arc::new(GradlePipeline::new(self.config.clone())),
        }
    }

    /// Downloads and extracts the server distribution.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self) -> Result<()> {
        Installer::new(self.config.clone()).install().await
    }

    /// Builds the server and deploys the artifact.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn build(&self, skip_tests: bool) -> Result<()> {
        let pipeline = self.pipeline();
        pipeline.build(&BuildOptions { skip_tests }).await?;
        pipeline.deploy().await
    }

    /// Stops any running instance, builds, deploys, and starts the server.
    ///
    /// When the trailing options only ask the server to print its version or
    /// check its config, the invocation runs in the foreground and none of
    /// the kill/build/deploy pre-steps happen: a pure config-print request
    /// must not disturb a running instance.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, options))]
    pub async fn run(&self, options: &StartOptions) -> Result<()> {
        let controller = self.controller();

        if options.is_print_only() {
            return controller.start(options).await;
        }

        if is_running(&TcpProber, &self.config).await {
            tracing::info!("Stopping running instance before rebuild");
            controller.stop_and_wait().await?;
        }

        let pipeline = self.pipeline();
        pipeline.build(&BuildOptions::default()).await?;
        pipeline.deploy().await?;
        controller.start(options).await
    }

    /// Signals every matching server process. Finding none is reported, not
    /// an error.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub fn kill(&self) -> Result<KillOutcome> {
        self.controller().stop()
    }

    /// Reports whether the server is running, with the effective endpoint.
    pub async fn status(&self) -> ServerStatus {
        self.controller().status().await
    }

    /// Runs the server, then watches the source tree and rebuilds on change
    /// until the process exits.
    ///
    /// Print-only options short-circuit exactly as in [`run`](Self::run).
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, options))]
    pub async fn watch(&self, options: &StartOptions, debounce: Duration) -> Result<()> {
        let controller = self.controller();

        if options.is_print_only() {
            return controller.start(options).await;
        }

        self.run(options).await?;

        let orchestrator = WatchOrchestrator::new(
            self.config.clone(),
            controller,
            self.pipeline(),
            Arc::new(TcpProber),
            options.clone(),
            debounce,
        );
        orchestrator.run().await
    }
}
