use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{BuildOptions, Pipeline};
use async_trait::async_trait;
use std::path::PathBuf;

/// Name of the artifact the server build produces.
const ARTIFACT_NAME: &str = "devserver.jar";

/// Builds via the repository's Gradle wrapper and deploys the produced jar
/// into the install directory.
///
/// The build child gets `current_dir(repo_root)`, so the CLI's own working
/// directory is never changed and never needs restoring, whatever the build
/// outcome.
pub struct GradlePipeline {
    config: Config,
}

impl GradlePipeline {
    /// Creates a pipeline over the given configuration snapshot.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The build tool to invoke: the repo's `gradlew` wrapper when present,
    /// otherwise the system `gradle` with a warning. A missing wrapper is a
    /// degradation, not a failure.
    fn build_program(&self) -> PathBuf {
        let wrapper = self.config.repo_root.join("gradlew");
        if wrapper.exists() {
            wrapper
        } else {
            tracing::warn!(
                repo = %self.config.repo_root.display(),
                "Gradle wrapper not found, falling back to system gradle"
            );
            PathBuf::from("gradle")
        }
    }

    /// Where the build drops the deployable artifact.
    fn build_artifact(&self) -> PathBuf {
        self.config.repo_root.join("build").join("libs").join(ARTIFACT_NAME)
    }
}

#[async_trait]
impl Pipeline for GradlePipeline {
    #[tracing::instrument(skip(self, options), fields(skip_tests = options.skip_tests))]
    async fn build(&self, options: &BuildOptions) -> Result<()> {
        let program = self.build_program();
        let mut command = async_process::Command::new(&program);
        command.arg("build").current_dir(&self.config.repo_root);
        if options.skip_tests {
            command.args(["-x", "test"]);
        }

        if self.config.debug_mode {
            tracing::debug!(program = %program.display(), "Invoking build tool");
        }
        tracing::info!("Building server");

        let status = command.status().await.map_err(|e| {
            Error::Build(format!("failed to run {}: {}", program.display(), e))
        })?;

        if status.success() {
            tracing::info!("Build succeeded");
            Ok(())
        } else {
            Err(Error::Build(format!("build exited with {}", status)))
        }
    }

    #[tracing::instrument(skip(self))]
    async fn deploy(&self) -> Result<()> {
        let artifact = self.build_artifact();
        if !artifact.exists() {
            // A successful build must precede deploy; a missing artifact
            // means that contract was broken.
            return Err(Error::Deploy(format!(
                "no build artifact at {}; run build first",
                artifact.display()
            )));
        }

        let install_dir = self.config.install_dir();
        std::fs::create_dir_all(&install_dir)
            .map_err(|e| Error::Deploy(format!("failed to create install dir: {}", e)))?;

        let target = self.config.deployed_jar();
        std::fs::copy(&artifact, &target)
            .map_err(|e| Error::Deploy(format!("failed to copy artifact: {}", e)))?;

        tracing::info!(target = %target.display(), "Deployed server artifact");
        Ok(())
    }
}
