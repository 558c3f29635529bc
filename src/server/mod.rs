/// Server management module for javactl.
///
/// This module handles liveness probing, process discovery, and lifecycle
/// control of the managed Java dev server. Public operations are
/// instrumented with `tracing` spans.
///
/// # Components
///
/// * `probe` - TCP liveness probing across the primary and debug ports
/// * `discovery` - Locating server instances in the OS process table
/// * `controller` - Start (with bounded liveness wait), stop, and status
///
/// # Examples
///
/// Checking whether the server is up:
///
/// ```no_run
/// use javactl::config::Config;
/// use javactl::server::{TcpProber, is_running};
///
/// # async fn check() {
/// let config = Config::new("/path/to/repo");
/// let prober = TcpProber;
/// if is_running(&prober, &config).await {
///     println!("server is live");
/// }
/// # }
/// ```
pub mod controller;
pub mod discovery;
pub mod probe;

pub use controller::{KillOutcome, OVERRIDES_ENV, ProcessController, ServerStatus, StartOptions};
pub use discovery::{DiscoveredProcess, DiscoveryStrategy, ProcessScanDiscovery};
pub use probe::{Prober, TcpProber, is_running};
