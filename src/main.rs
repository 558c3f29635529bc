//! CLI entrypoint for javactl.
//!
//! Thin plumbing: argument parsing, logging setup, and exit codes. All
//! lifecycle behavior lives in the library's [`Lifecycle`] façade.
use clap::{Parser, Subcommand};
use javactl::config::Config;
use javactl::error::{Error, Result};
use javactl::watch::DEFAULT_DEBOUNCE;
use javactl::{KillOutcome, Lifecycle, StartOptions};
use std::path::PathBuf;
use std::time::Duration;

/// javactl - manage the lifecycle of a local Java dev server
#[derive(Parser)]
#[command(name = "javactl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a javactl JSON config file
    #[arg(long, global = true, env = "JAVACTL_CONFIG")]
    config: Option<PathBuf>,

    /// Repository root of the server source (defaults to the current directory)
    #[arg(long, global = true)]
    repo_root: Option<PathBuf>,

    /// HTTP port override (the debug listener is always port + 1000)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Surface diagnostic detail and lower the log filter to debug
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract the server distribution
    Install,

    /// Build the server and deploy the artifact
    Build {
        /// Skip the test task
        #[arg(long)]
        skip_tests: bool,
    },

    /// Stop any running instance, build, deploy, and start the server
    Run {
        /// Options forwarded verbatim to the server
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Terminate every matching server process
    Kill,

    /// Report whether the server is running
    Status,

    /// Run the server, then rebuild and restart on source changes
    Watch {
        /// Quiet period in milliseconds before a burst of changes rebuilds
        #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
        debounce_ms: u64,

        /// Options forwarded verbatim to the server
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = execute(cli).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

/// Env-filter logging; `RUST_LOG` wins, otherwise info (debug in debug mode).
fn init_tracing(debug: bool) {
    let default_filter = if debug { "javactl=debug" } else { "javactl=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => {
            let root = std::env::current_dir()
                .map_err(|e| Error::Other(format!("cannot determine working directory: {}", e)))?;
            Config::new(root)
        }
    };
    if let Some(root) = cli.repo_root {
        config.repo_root = root;
    }

    let mut lifecycle = Lifecycle::new(config)?;
    if let Some(port) = cli.port {
        lifecycle.set_http_port(port)?;
    }
    if cli.debug {
        lifecycle.set_debug_mode(true);
    }

    match cli.command {
        Commands::Install => lifecycle.install().await,
        Commands::Build { skip_tests } => lifecycle.build(skip_tests).await,
        Commands::Run { args } => lifecycle.run(&StartOptions::new(args)).await,
        Commands::Kill => {
            match lifecycle.kill()? {
                KillOutcome::NothingToKill => println!("Nothing to kill."),
                KillOutcome::Signalled { signalled, failed } => {
                    println!("Signalled {} process(es).", signalled);
                    if failed > 0 {
                        println!("{} process(es) could not be signalled; see log.", failed);
                    }
                }
            }
            Ok(())
        }
        Commands::Status => {
            println!("Server status: {}", lifecycle.status().await);
            Ok(())
        }
        Commands::Watch { debounce_ms, args } => {
            lifecycle
                .watch(&StartOptions::new(args), Duration::from_millis(debounce_ms))
                .await
        }
    }
}
