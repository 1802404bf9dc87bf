//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder that may prefix a file name and stands for the data directory.
pub const DATA_DIRECTORY_PLACEHOLDER: &str = "|DataDirectory|";

/// Root configuration for the interception engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Directory substituted for the `|DataDirectory|` placeholder.
    /// Falls back to the directory of the running executable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,

    /// Extension appended to database file names that have none (default: "accdb").
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            default_extension: default_extension(),
        }
    }
}

impl ShimConfig {
    /// Override the data directory.
    pub fn with_data_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_directory = Some(dir.into());
        self
    }

    /// Override the default database extension.
    pub fn with_default_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_extension = ext.into();
        self
    }

    /// The directory used to expand `|DataDirectory|`.
    pub fn effective_data_directory(&self) -> PathBuf {
        if let Some(ref dir) = self.data_directory {
            return dir.clone();
        }
        process_base_directory()
    }
}

/// Directory of the running executable, or the working directory if unknown.
pub fn process_base_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_extension() -> String {
    "accdb".to_string()
}
