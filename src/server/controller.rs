use crate::config::Config;
use crate::error::{Error, Result};
use crate::server::discovery::DiscoveryStrategy;
use crate::server::probe::{LOOPBACK_HOST, Prober, is_running};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable the managed server reads config overrides from, as
/// `path->value` directives joined with `;`.
pub const OVERRIDES_ENV: &str = "DEVSERVER_OVERRIDES";

/// Startup liveness wait: poll interval and attempt budget (~6 seconds).
/// Exceeding the budget is definitive failure, never retried.
const START_POLL_INTERVAL: Duration = Duration::from_millis(200);
const START_ATTEMPTS: u32 = 30;

/// Shutdown wait used by `stop_and_wait`: 50 x 100ms.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_ATTEMPTS: u32 = 50;

/// How much of the server log to surface when startup fails.
const LOG_TAIL_CHARS: usize = 1000;

/// Bytes read from the end of the log to produce that tail.
const TAIL_READ_BYTES: u64 = 4096;

/// Flags in the trailing options that mean "print version or effective
/// config and exit". Such invocations run in the foreground and skip
/// lifecycle supervision entirely.
const PRINT_ONLY_FLAGS: &[&str] = &[
    "-v",
    "-V",
    "--version",
    "-t",
    "--configtest",
    "-c",
    "--check-config",
];

/// Options forwarded verbatim to the managed server at startup.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Free-form trailing arguments, passed through unmodified.
    pub args: Vec<String>,
}

impl StartOptions {
    /// Creates options from trailing CLI arguments.
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Whether these options ask the server to print its version or check
    /// its config and exit, rather than serve.
    pub fn is_print_only(&self) -> bool {
        self.args
            .iter()
            .any(|arg| PRINT_ONLY_FLAGS.contains(&arg.as_str()))
    }

    /// Path of a server config file passed as `-Dconfig.file=<path>`, if any.
    pub fn config_file_override(&self) -> Option<PathBuf> {
        self.args
            .iter()
            .find_map(|arg| arg.strip_prefix("-Dconfig.file="))
            .map(PathBuf::from)
    }
}

/// Subset of the managed server's own config file the controller cares
/// about when reporting the effective endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerConfigOverride {
    http_port: Option<u16>,
}

/// Outcome of a kill operation.
///
/// Finding nothing to kill is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// No matching process existed.
    NothingToKill,
    /// Termination was attempted on every match; `failed` of them could not
    /// be signalled (logged, not fatal).
    Signalled { signalled: usize, failed: usize },
}

/// Running/not-running report for the status command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    /// Whether either liveness port accepted a connection.
    pub running: bool,
    /// Host the probe targeted.
    pub host: String,
    /// Primary HTTP port.
    pub port: u16,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.running {
            write!(f, "running at {}:{}", self.host, self.port)
        } else {
            write!(f, "not running")
        }
    }
}

/// Controls the managed server process: start with a bounded liveness wait,
/// best-effort kill via discovery, and status reporting.
///
/// No child handle is retained for the detached server; every operation
/// re-discovers it through the injected [`DiscoveryStrategy`].
pub struct ProcessController {
    config: Config,
    prober: Arc<dyn Prober>,
    discovery: Arc<dyn DiscoveryStrategy>,
    /// Pre-existing override directives, captured once per CLI session.
    /// Restarts compose from this original value so directives never
    /// accumulate across repeated start calls.
    env_baseline: Option<String>,
    /// The JVM launcher: `$JAVA_HOME/bin/java` when set, else `java` from
    /// the PATH.
    java_executable: PathBuf,
}

impl ProcessController {
    /// Creates a controller, capturing the current override environment as
    /// the merge baseline.
    pub fn new(
        config: Config,
        prober: Arc<dyn Prober>,
        discovery: Arc<dyn DiscoveryStrategy>,
    ) -> Self {
        let java_executable = match std::env::var_os("JAVA_HOME") {
            Some(home) => PathBuf::from(home).join("bin").join("java"),
            None => PathBuf::from("java"),
        };
        Self {
            config,
            prober,
            discovery,
            env_baseline: std::env::var(OVERRIDES_ENV).ok(),
            java_executable,
        }
    }

    /// Overrides the JVM launcher executable.
    pub fn with_java_executable(mut self, java: impl Into<PathBuf>) -> Self {
        self.java_executable = java.into();
        self
    }

    /// Replaces the captured baseline. The lifecycle manager uses this so all
    /// controllers in one CLI session share the baseline captured at session
    /// start; tests use it to pin a known value.
    pub fn with_env_baseline(mut self, baseline: Option<String>) -> Self {
        self.env_baseline = baseline;
        self
    }

    /// Composes the override directives for the next launch.
    ///
    /// Appends the port and logging directives to the captured baseline with
    /// `;`, preserving prior content. Calling this any number of times yields
    /// the same value.
    pub fn compose_overrides(&self) -> String {
        let level = if self.config.debug_mode {
            "debug"
        } else {
            "info"
        };
        let directives = format!(
            "http.port->{};log.level->{}",
            self.config.http_port, level
        );
        match self.env_baseline.as_deref() {
            Some(baseline) if !baseline.is_empty() => format!("{};{}", baseline, directives),
            _ => directives,
        }
    }

    /// Verifies the Java runtime is present. Fatal if not; nothing in the
    /// lifecycle can proceed without it.
    pub async fn ensure_runtime(&self) -> Result<()> {
        let status = async_process::Command::new(&self.java_executable)
            .arg("-version")
            .stdout(async_process::Stdio::null())
            .stderr(async_process::Stdio::null())
            .status()
            .await
            .map_err(|e| {
                Error::RuntimeMissing(format!(
                    "could not execute `{} -version`: {}",
                    self.java_executable.display(),
                    e
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::RuntimeMissing(format!(
                "`java -version` exited with {}",
                status
            )))
        }
    }

    /// Starts the managed server.
    ///
    /// Print-only invocations run in the foreground and return as soon as the
    /// server exits. Otherwise the server is launched detached with its
    /// output redirected to the repo-root log file, and liveness is polled
    /// every 200ms for up to 30 attempts.
    ///
    /// # Errors
    ///
    /// * `Error::RuntimeMissing` when no JVM is available (never retried)
    /// * `Error::Process` when the spawn itself fails
    /// * `Error::StartupTimeout` when the poll budget elapses; the message
    ///   carries the tail of the server log
    #[tracing::instrument(skip(self, options))]
    pub async fn start(&self, options: &StartOptions) -> Result<()> {
        self.ensure_runtime().await?;

        if options.is_print_only() {
            tracing::info!("Print-only flags detected, running server in foreground");
            return self.run_foreground(options).await;
        }

        let overrides = self.compose_overrides();
        if self.config.debug_mode {
            tracing::debug!(%overrides, args = ?options.args, "Launching managed server");
        }
        self.spawn_detached(options, &overrides)?;

        for attempt in 1..=START_ATTEMPTS {
            tokio::time::sleep(START_POLL_INTERVAL).await;
            if is_running(self.prober.as_ref(), &self.config).await {
                let port = self.effective_port(options);
                tracing::info!(%port, attempt, "Server is up at http://{}:{}", LOOPBACK_HOST, port);
                return Ok(());
            }
            tracing::trace!(attempt, "Server not live yet");
        }

        let mut message = format!(
            "no listener on port {} (or +1000) after {} attempts",
            self.config.http_port, START_ATTEMPTS
        );
        if let Some(tail) = self.log_tail() {
            message.push_str("; log tail:\n");
            message.push_str(&tail);
        }
        Err(Error::StartupTimeout(message))
    }

    /// Runs the server synchronously in the foreground, inheriting stdio.
    /// Used only for print-only invocations; no supervision, no liveness wait.
    async fn run_foreground(&self, options: &StartOptions) -> Result<()> {
        let status = async_process::Command::new(&self.java_executable)
            .arg("-jar")
            .arg(self.config.deployed_jar())
            .args(&options.args)
            .status()
            .await
            .map_err(|e| Error::Process(format!("Failed to run server in foreground: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Process(format!(
                "Foreground server invocation exited with {}",
                status
            )))
        }
    }

    /// Spawns the server detached, stdout/stderr redirected to the log file.
    /// On Unix the child becomes its own session leader so it survives
    /// signals delivered to the CLI's group. The child handle is dropped on
    /// purpose: liveness and kill go through probing and discovery.
    fn spawn_detached(&self, options: &StartOptions, overrides: &str) -> Result<()> {
        use std::process::{Command, Stdio};

        let log_path = self.config.server_log();
        let log_file = std::fs::File::create(&log_path)
            .map_err(|e| Error::Process(format!("Failed to create server log: {}", e)))?;
        let log_file_stderr = log_file
            .try_clone()
            .map_err(|e| Error::Process(format!("Failed to clone log handle: {}", e)))?;

        let mut command = Command::new(&self.java_executable);
        command
            .arg("-jar")
            .arg(self.config.deployed_jar())
            .args(&options.args)
            .current_dir(&self.config.repo_root)
            .env(OVERRIDES_ENV, overrides)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(log_file_stderr));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // SAFETY: only async-signal-safe calls (setsid, fork, _exit).
            // The child becomes a session leader and forks once more; the
            // intermediate exits immediately, so the server is reparented to
            // init. Without the second fork, every restart in a long watch
            // session would leave one zombie in our process table.
            unsafe {
                command.pre_exec(|| {
                    libc::setsid();
                    match libc::fork() {
                        -1 => Err(std::io::Error::last_os_error()),
                        0 => Ok(()),
                        _ => libc::_exit(0),
                    }
                });
            }
        }

        let child = command
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to start server process: {}", e)))?;
        reap_launcher(child)?;

        tracing::debug!(log = %log_path.display(), "Server spawned detached");
        Ok(())
    }

    /// The port to report once the server is live: an optional server config
    /// file passed via the options may override the default. Unreadable
    /// override files are logged and ignored.
    fn effective_port(&self, options: &StartOptions) -> u16 {
        let Some(path) = options.config_file_override() else {
            return self.config.http_port;
        };

        match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<ServerConfigOverride>(&content).map_err(|e| e.to_string())
            }) {
            Ok(server_config) => server_config.http_port.unwrap_or(self.config.http_port),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config override");
                self.config.http_port
            }
        }
    }

    /// Signals every discovered server instance, fire-and-forget.
    ///
    /// Individual signal failures are logged and do not abort the remaining
    /// matches. An empty match set reports [`KillOutcome::NothingToKill`].
    #[tracing::instrument(skip(self))]
    pub fn stop(&self) -> Result<KillOutcome> {
        let matches = self.discovery.discover(&self.config.server_signature);

        if matches.is_empty() {
            tracing::info!("No matching server process, nothing to kill");
            return Ok(KillOutcome::NothingToKill);
        }

        let mut signalled = 0;
        let mut failed = 0;
        for process in &matches {
            match self.discovery.terminate(process) {
                Ok(()) => {
                    tracing::info!(pid = process.pid, "Sent termination signal");
                    signalled += 1;
                }
                Err(e) => {
                    tracing::warn!(pid = process.pid, error = %e, "Failed to signal process");
                    failed += 1;
                }
            }
        }

        Ok(KillOutcome::Signalled { signalled, failed })
    }

    /// Stops the server and waits for liveness to clear, so a follow-up start
    /// does not race the dying instance for the port.
    ///
    /// # Errors
    ///
    /// `Error::Process` when the port is still occupied after the bounded
    /// wait.
    #[tracing::instrument(skip(self))]
    pub async fn stop_and_wait(&self) -> Result<KillOutcome> {
        let outcome = self.stop()?;

        for _ in 0..STOP_ATTEMPTS {
            if !is_running(self.prober.as_ref(), &self.config).await {
                return Ok(outcome);
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        Err(Error::Process(format!(
            "server did not release port {} within the shutdown wait",
            self.config.http_port
        )))
    }

    /// Reports whether the server is live, with the effective endpoint.
    pub async fn status(&self) -> ServerStatus {
        ServerStatus {
            running: is_running(self.prober.as_ref(), &self.config).await,
            host: LOOPBACK_HOST.to_string(),
            port: self.config.http_port,
        }
    }

    /// Last ~1000 characters of the server log, if the log exists.
    fn log_tail(&self) -> Option<String> {
        read_tail(&self.config.server_log())
    }
}

/// Reaps the short-lived launcher forked off in `spawn_detached`. The server
/// itself was reparented to init, so this wait returns immediately.
#[cfg(unix)]
fn reap_launcher(mut child: std::process::Child) -> Result<()> {
    child
        .wait()
        .map_err(|e| Error::Process(format!("Failed to reap server launcher: {}", e)))?;
    Ok(())
}

#[cfg(not(unix))]
fn reap_launcher(_child: std::process::Child) -> Result<()> {
    Ok(())
}

/// Last ~1000 characters of a log file, reading only its final bytes so the
/// tail stays cheap however large the log has grown.
fn read_tail(path: &Path) -> Option<String> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = std::fs::File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    file.seek(SeekFrom::Start(len.saturating_sub(TAIL_READ_BYTES)))
        .ok()?;

    let mut buf = Vec::with_capacity(TAIL_READ_BYTES as usize);
    file.read_to_end(&mut buf).ok()?;

    // The seek may land inside a multi-byte character; lossy decoding turns
    // the cut prefix into a replacement character instead of failing.
    let text = String::from_utf8_lossy(&buf);
    let tail: String = text
        .chars()
        .rev()
        .take(LOG_TAIL_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Some(tail)
}
