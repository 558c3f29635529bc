//! Change-watch orchestration for javactl.
//!
//! One long-lived session per `watch` command: filesystem events from the
//! source tree are debounced through an explicit {Idle, Pending, Rebuilding}
//! state machine, and each fired deadline sequences one full rebuild cycle
//! (stop, build, deploy, restart). Cycle failures are logged and the session
//! keeps watching; only the initial watcher setup can fail the command.
mod orchestrator;
mod session;

pub use orchestrator::WatchOrchestrator;
pub use session::{DEFAULT_DEBOUNCE, WatchSession, WatchState};
