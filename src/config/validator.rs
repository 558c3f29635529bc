use crate::config::Config;
use crate::error::{Error, Result};

/// Validates a configuration snapshot once, at construction time.
///
/// Components downstream trust a validated config and do not re-check.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.http_port == 0 {
        return Err(Error::ConfigInvalid(
            "httpPort must be between 1 and 65535".to_string(),
        ));
    }

    if !config.repo_root.exists() {
        return Err(Error::ConfigInvalid(format!(
            "repository root {} does not exist",
            config.repo_root.display()
        )));
    }

    if config.server_signature.is_empty() {
        return Err(Error::ConfigInvalid(
            "serverSignature must not be empty".to_string(),
        ));
    }

    // Cache and install directories are created on demand, not validated here.

    Ok(())
}
