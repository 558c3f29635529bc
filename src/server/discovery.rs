use crate::error::{Error, Result};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, Signal, System};

/// A process matched by a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProcess {
    /// OS process id.
    pub pid: u32,
    /// Executable name as reported by the OS.
    pub name: String,
    /// Full command line, joined with spaces.
    pub cmdline: String,
}

/// Strategy for locating and terminating managed server instances.
///
/// The server is never tracked through an owned child handle; every kill and
/// status operation re-discovers it from scratch. Keeping discovery behind a
/// trait means the command-line scan below can be swapped for a PID-file
/// strategy without touching any caller.
pub trait DiscoveryStrategy: Send + Sync {
    /// Returns every process whose executable is the Java runtime and whose
    /// command line contains `signature`.
    fn discover(&self, signature: &str) -> Vec<DiscoveredProcess>;

    /// Sends a graceful termination signal to one discovered process.
    ///
    /// # Errors
    ///
    /// Returns `Error::Process` if the signal cannot be delivered, e.g. the
    /// process already exited or belongs to another user. Callers treat this
    /// as best-effort and continue with remaining matches.
    fn terminate(&self, process: &DiscoveredProcess) -> Result<()>;
}

/// Name of the runtime executable the scan filters on.
const RUNTIME_EXECUTABLE: &str = "java";

/// Discovery by scanning the OS process table.
///
/// Matches duck-typed: a process is "ours" when it is a `java` executable
/// whose command line carries the configured server signature. Refreshing the
/// whole table is expensive but kill/status are rare, operator-driven
/// operations.
#[derive(Debug, Clone, Default)]
pub struct ProcessScanDiscovery;

impl DiscoveryStrategy for ProcessScanDiscovery {
    fn discover(&self, signature: &str) -> Vec<DiscoveredProcess> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new(),
        );

        let mut matches = Vec::new();
        for (pid, process) in system.processes() {
            let name = process.name().to_string_lossy().to_string();
            if !name.contains(RUNTIME_EXECUTABLE) {
                continue;
            }

            let cmdline = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            if cmdline.contains(signature) {
                tracing::debug!(pid = pid.as_u32(), %cmdline, "Matched managed server process");
                matches.push(DiscoveredProcess {
                    pid: pid.as_u32(),
                    name,
                    cmdline,
                });
            }
        }

        matches
    }

    fn terminate(&self, process: &DiscoveredProcess) -> Result<()> {
        let mut system = System::new();
        let pid = sysinfo::Pid::from_u32(process.pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new(),
        );

        let proc = system
            .process(pid)
            .ok_or_else(|| Error::Process(format!("Process {} already gone", process.pid)))?;

        // Prefer a graceful SIGTERM; fall back to the platform default where
        // the signal is unsupported.
        let delivered = match proc.kill_with(Signal::Term) {
            Some(ok) => ok,
            None => proc.kill(),
        };

        if delivered {
            Ok(())
        } else {
            Err(Error::Process(format!(
                "Failed to signal process {}",
                process.pid
            )))
        }
    }
}
