use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port of the managed dev server.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Fixed offset between the primary HTTP port and the secondary debug
/// listener. Not configurable.
pub const DEBUG_PORT_OFFSET: u16 = 1000;

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_server_signature() -> String {
    "devserver.jar".to_string()
}

fn default_distribution_url() -> String {
    "https://downloads.devserver.dev/devserver-dist.tar.gz".to_string()
}

fn default_watch_patterns() -> Vec<String> {
    ["*.java", "*.properties", "*.xml", "*.gradle"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("javactl")
}

/// Configuration snapshot for one command invocation.
///
/// Owned by the lifecycle manager and passed by value into each component's
/// constructor; components never reach for a process-wide singleton. The
/// snapshot is immutable during a command's execution; explicit setters on
/// the lifecycle manager are the only mutation path, and they run before a
/// command's steps begin.
///
/// # JSON Schema
///
/// ```json
/// {
///   "repoRoot": "/home/dev/devserver",
///   "cacheDir": "/home/dev/.cache/javactl",
///   "installDir": "/home/dev/devserver/.devserver",
///   "httpPort": 8080,
///   "debugMode": false
/// }
/// ```
///
/// All fields except `repoRoot` have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the server source repository. Builds run here, and the
    /// managed server's log file lives here.
    pub repo_root: PathBuf,

    /// Directory for downloaded distribution archives.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory the server runs from; deploy copies artifacts here.
    /// Defaults to `<repoRoot>/.devserver`.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Primary HTTP port of the managed server. The secondary debug listener
    /// is always at `httpPort + 1000`.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// When set, diagnostic detail (raw command lines, full error chains) is
    /// surfaced and the log filter drops to `debug`.
    #[serde(default)]
    pub debug_mode: bool,

    /// Substring that identifies the managed server's command line among
    /// sibling Java processes during discovery.
    #[serde(default = "default_server_signature")]
    pub server_signature: String,

    /// Where `install` fetches the server distribution from.
    #[serde(default = "default_distribution_url")]
    pub distribution_url: String,

    /// Filename patterns the watch command reacts to.
    #[serde(default = "default_watch_patterns")]
    pub watch_patterns: Vec<String>,
}

impl Config {
    /// Creates a configuration with defaults for the given repository root.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            cache_dir: default_cache_dir(),
            install_dir: None,
            http_port: DEFAULT_HTTP_PORT,
            debug_mode: false,
            server_signature: default_server_signature(),
            distribution_url: default_distribution_url(),
            watch_patterns: default_watch_patterns(),
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` if the file cannot be read, is not valid
    /// JSON, or does not conform to the expected schema.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` if the string is not valid JSON or does
    /// not conform to the expected schema.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// The install directory, falling back to `<repoRoot>/.devserver`.
    pub fn install_dir(&self) -> PathBuf {
        self.install_dir
            .clone()
            .unwrap_or_else(|| self.repo_root.join(".devserver"))
    }

    /// The secondary debug listener port, `httpPort + 1000`.
    ///
    /// `None` when the offset would overflow the port space; such a listener
    /// cannot exist, so liveness falls back to the primary port alone.
    pub fn debug_port(&self) -> Option<u16> {
        self.http_port.checked_add(DEBUG_PORT_OFFSET)
    }

    /// Path of the jar the server runs from once deployed.
    pub fn deployed_jar(&self) -> PathBuf {
        self.install_dir().join("devserver.jar")
    }

    /// Path the managed server's stdout/stderr is redirected to.
    pub fn server_log(&self) -> PathBuf {
        self.repo_root.join("devserver.log")
    }
}
