//! Configuration validation.

use super::ShimConfig;
use crate::error::{Result, ShimError};

/// Validate the configuration.
pub fn validate(config: &ShimConfig) -> Result<()> {
    let ext = config.default_extension.as_str();
    if ext.trim().is_empty() {
        return Err(ShimError::Config("default_extension is required".into()));
    }
    if ext.starts_with('.') {
        return Err(ShimError::Config(format!(
            "default_extension must not start with '.', got '{}'",
            ext
        )));
    }
    if ext.contains(['/', '\\']) {
        return Err(ShimError::Config(format!(
            "default_extension must not contain path separators, got '{}'",
            ext
        )));
    }

    if let Some(ref dir) = config.data_directory {
        if dir.as_os_str().is_empty() {
            return Err(ShimError::Config(
                "data_directory cannot be empty when set".into(),
            ));
        }
    }

    Ok(())
}
