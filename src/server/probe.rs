use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// How long a single connect attempt may take before it counts as
/// "not running".
const PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Loopback address used for probing; status reporting uses the same one,
/// so the endpoint the operator sees is the endpoint that was checked.
pub(crate) const LOOPBACK_HOST: &str = "127.0.0.1";

/// Liveness probing seam.
///
/// The managed server is considered running when a TCP connection to one of
/// its ports succeeds. Abstracting the probe behind a trait lets the
/// controller's bounded startup wait be tested without binding real sockets.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Attempts a TCP connect to `127.0.0.1:port`.
    ///
    /// Returns `true` iff the connection succeeds (it is closed immediately).
    /// Any failure, refused or timed out alike, is the normal "not running"
    /// signal, so no error is ever propagated.
    async fn probe(&self, port: u16) -> bool;
}

/// Default prober connecting over the loopback interface.
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, port: u16) -> bool {
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((LOOPBACK_HOST, port))).await,
            Ok(Ok(_))
        )
    }
}

/// Whether the managed server is currently live.
///
/// The logical OR of the primary port and the fixed-offset debug listener:
/// either being reachable counts as "running", since the server binds both.
/// This is a heuristic, not a health check: an unrelated process on either
/// port reads as running, and a slowly-starting server reads as down until
/// its listener binds (the startup wait retries for that reason). Never
/// cached; recomputed on every call.
pub async fn is_running(prober: &dyn Prober, config: &Config) -> bool {
    if prober.probe(config.http_port).await {
        return true;
    }
    match config.debug_port() {
        Some(port) => prober.probe(port).await,
        None => false,
    }
}
