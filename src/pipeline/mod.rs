//! Build and deploy pipeline for javactl.
//!
//! The lifecycle core treats building and deploying as an external
//! collaborator: both steps are synchronous from the caller's point of view,
//! both can fail fatally, and the only contract the core relies on is their
//! success/failure signal. Deploy is never invoked without a prior
//! successful build; the Gradle implementation additionally refuses to
//! deploy when no artifact exists.
//!
//! The [`Pipeline`] trait exists so the watch orchestrator and the tests can
//! substitute the real Gradle invocation.
mod gradle;

use crate::error::Result;
use async_trait::async_trait;

pub use gradle::GradlePipeline;

/// Options for one build invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Skip the test task. Watch-triggered rebuilds always set this; a
    /// one-shot `build` command runs tests.
    pub skip_tests: bool,
}

/// External build/deploy collaborator boundary.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Invokes the build tool. A non-zero exit is fatal to the command in
    /// flight.
    async fn build(&self, options: &BuildOptions) -> Result<()>;

    /// Copies the build artifact into the install directory. Must only be
    /// called after a successful [`build`](Pipeline::build).
    async fn deploy(&self) -> Result<()>;
}
