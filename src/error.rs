/// Error handling module for javactl.
///
/// This module defines the error types used throughout the crate. The
/// variants follow the lifecycle's failure taxonomy: environment problems
/// (missing runtime), build/deploy failures, and startup timeouts are fatal
/// to the command in flight, while discovery misses and watch-cycle failures
/// are handled where they occur and never reach this type.
///
/// # Example
///
/// ```
/// use javactl::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::RuntimeMissing(msg)) => println!("Install a JVM first: {}", msg),
///         Err(Error::StartupTimeout(msg)) => println!("Server never came up: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur while managing the dev server lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON is malformed
    /// - Required fields are missing
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - The HTTP port is zero
    /// - The repository root does not exist
    /// - The server signature is empty
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The Java runtime required to launch the managed server is absent.
    ///
    /// Fatal and never retried: without a JVM there is nothing to start,
    /// build against, or kill.
    #[error("Java runtime not available: {0}")]
    RuntimeMissing(String),

    /// Error when spawning, signalling, or supervising a server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// The build step exited with a failure.
    ///
    /// Fatal to the command in flight: deploy is never attempted after a
    /// failed build, and a stale instance is never started.
    #[error("Build failed: {0}")]
    Build(String),

    /// The deploy step failed.
    ///
    /// This error occurs when:
    /// - No build artifact exists to deploy
    /// - Copying the artifact into the install directory fails
    #[error("Deploy failed: {0}")]
    Deploy(String),

    /// The managed server did not become live within the bounded poll window.
    ///
    /// The message carries the tail of the server log so the operator can see
    /// why startup stalled. The wait is never extended or retried.
    #[error("Server did not start in time: {0}")]
    StartupTimeout(String),

    /// Downloading or extracting the server distribution failed.
    #[error("Install failed: {0}")]
    Install(String),

    /// The filesystem watcher could not be created or attached.
    ///
    /// Failures of individual rebuild cycles are logged inside the watch
    /// session instead; only setup problems surface as this variant.
    #[error("Watch error: {0}")]
    Watch(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for javactl operations.
///
/// Convenience alias for `std::result::Result` with this module's `Error`,
/// used throughout the crate and in the CLI entrypoint.
pub type Result<T> = std::result::Result<T, Error>;
