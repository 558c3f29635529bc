//! Configuration module for javactl.
//!
//! This module handles parsing, validation, and access to the configuration
//! snapshot shared by every lifecycle component: repository root, cache and
//! install directories, HTTP port, and debug mode. Configurations can be
//! loaded from JSON files or built programmatically from a repository root.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use javactl::config::Config;
//!
//! let config = Config::from_file("javactl.json").unwrap();
//! println!("Managing server on port {}", config.http_port);
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```no_run
//! use javactl::config::Config;
//!
//! let config = Config::new("/path/to/repo");
//! assert_eq!(config.http_port, 8080);
//! ```
mod parser;
pub mod validator;

pub use parser::{Config, DEFAULT_HTTP_PORT, DEBUG_PORT_OFFSET};
pub use validator::validate_config;
