//! Database creation and removal at the file-system level.
//!
//! The engine cannot execute `CREATE DATABASE` or `DROP DATABASE`, so both
//! are carried out here:
//!
//! - create: resolve the path, apply the default extension, hand the file to
//!   the store engine
//! - drop: resolve the path, evict pooled connections, delete the database
//!   file and its lock files
//!
//! A drop of a file that does not exist succeeds without doing anything.
//!
//! Pools are drained by eviction, not by locking. Another caller may reopen
//! the file between the drain and the delete; the delete then fails with the
//! engine's sharing error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ShimConfig;
use crate::connection::{ensure_default_extension, expand_file_name, resolve_data_source};
use crate::core::{PoolManager, StoreEngine};
use crate::error::{Result, ShimError};
use crate::pattern::LifecycleRequest;

const LEGACY_EXTENSIONS: &[&str] = &["mdb", "mde", "mda"];
const MODERN_EXTENSIONS: &[&str] = &["accdb", "accde", "accdt", "accda"];

/// On-disk format family of a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// `.mdb` family, locked through `.ldb` files.
    Legacy,
    /// `.accdb` family, locked through `.laccdb` files.
    Modern,
}

impl StorageFormat {
    /// Family of a known extension, ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        if LEGACY_EXTENSIONS.contains(&ext.as_str()) {
            Some(StorageFormat::Legacy)
        } else if MODERN_EXTENSIONS.contains(&ext.as_str()) {
            Some(StorageFormat::Modern)
        } else {
            None
        }
    }

    /// Format used for a path: legacy only for legacy extensions.
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(StorageFormat::Modern)
    }

    /// Extension of the companion lock file.
    pub fn lock_extension(self) -> &'static str {
        match self {
            StorageFormat::Legacy => "ldb",
            StorageFormat::Modern => "laccdb",
        }
    }
}

/// Lock files that may accompany a database file.
///
/// Without an extension the family is unknown, so both candidates are
/// returned. An extension outside both families has no lock file.
pub fn lock_files(path: &Path) -> Vec<PathBuf> {
    let formats: &[StorageFormat] = match path.extension() {
        None => &[StorageFormat::Legacy, StorageFormat::Modern],
        Some(ext) if ext.is_empty() => &[StorageFormat::Legacy, StorageFormat::Modern],
        Some(ext) => match ext.to_str().and_then(StorageFormat::from_extension) {
            Some(StorageFormat::Legacy) => &[StorageFormat::Legacy],
            Some(StorageFormat::Modern) => &[StorageFormat::Modern],
            None => &[],
        },
    };

    formats
        .iter()
        .map(|format| path.with_extension(format.lock_extension()))
        .collect()
}

/// Progress of one lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Parsed,
    Draining,
    Executing,
    Done,
    Failed,
}

impl LifecycleState {
    /// Whether `next` may follow this state.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Parsed) => true,
            (Parsed, Draining) | (Parsed, Executing) => true,
            (Draining, Executing) => true,
            (Executing, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Parsed => "parsed",
            LifecycleState::Draining => "draining",
            LifecycleState::Executing => "executing",
            LifecycleState::Done => "done",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-request state tracker; logs every transition.
#[derive(Debug)]
struct Progress {
    operation: &'static str,
    state: LifecycleState,
}

impl Progress {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            state: LifecycleState::Idle,
        }
    }

    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "{} -> {} is not a valid transition",
            self.state,
            next
        );
        debug!("{}: {} -> {}", self.operation, self.state, next);
        self.state = next;
    }

    /// Record the outcome of a step, moving to `Failed` on error.
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.advance(LifecycleState::Failed);
        }
        result
    }
}

/// Result of a lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum LifecycleOutcome {
    Created(PathBuf),
    Dropped(PathBuf),
    /// Drop target did not exist.
    NoOp(PathBuf),
}

impl LifecycleOutcome {
    pub fn path(&self) -> &Path {
        match self {
            LifecycleOutcome::Created(p) | LifecycleOutcome::Dropped(p) | LifecycleOutcome::NoOp(p) => p,
        }
    }
}

/// Executes `CREATE DATABASE` and `DROP DATABASE`.
#[derive(Clone)]
pub struct LifecycleExecutor {
    pools: Arc<dyn PoolManager>,
    engine: Arc<dyn StoreEngine>,
    config: ShimConfig,
}

impl LifecycleExecutor {
    pub fn new(pools: Arc<dyn PoolManager>, engine: Arc<dyn StoreEngine>, config: ShimConfig) -> Self {
        Self {
            pools,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Dispatch a classified request to its entry point.
    pub async fn execute(&self, request: &LifecycleRequest) -> Result<LifecycleOutcome> {
        match request {
            LifecycleRequest::Create {
                file_name,
                password,
            } => self.create_database(file_name, password.as_deref()).await,
            LifecycleRequest::Drop { target } => self.drop_database(target).await,
        }
    }

    /// Absolute path of a drop or probe target.
    ///
    /// Connection strings resolve to their data source; no extension is added.
    pub fn resolve_target(&self, target: &str) -> Result<PathBuf> {
        if target.trim().is_empty() {
            return Err(ShimError::missing_field("file name or connection string", target));
        }
        let data_source = resolve_data_source(target);
        expand_file_name(&data_source, &self.config.effective_data_directory())
    }

    /// Absolute path a new database would be created at.
    pub fn resolve_create_path(&self, file_name: &str) -> Result<PathBuf> {
        if file_name.trim().is_empty() {
            return Err(ShimError::missing_field("file name", file_name));
        }
        let expanded = expand_file_name(file_name, &self.config.effective_data_directory())?;
        Ok(ensure_default_extension(&expanded, &self.config.default_extension))
    }

    /// Create a new database file.
    pub async fn create_database(
        &self,
        file_name: &str,
        password: Option<&str>,
    ) -> Result<LifecycleOutcome> {
        let mut progress = Progress::new("create database");

        let path = progress.track(self.resolve_create_path(file_name))?;
        progress.advance(LifecycleState::Parsed);

        let format = StorageFormat::for_path(&path);
        progress.advance(LifecycleState::Executing);
        progress.track(
            self.engine
                .create_database(&path, password.filter(|p| !p.is_empty()), format)
                .await,
        )?;

        progress.advance(LifecycleState::Done);
        info!("Created {:?} database {}", format, path.display());
        Ok(LifecycleOutcome::Created(path))
    }

    /// Delete a database file and its lock files.
    pub async fn drop_database(&self, target: &str) -> Result<LifecycleOutcome> {
        let mut progress = Progress::new("drop database");

        let path = progress.track(self.resolve_target(target))?;
        progress.advance(LifecycleState::Parsed);

        progress.advance(LifecycleState::Draining);
        progress.track(self.pools.clear_pool(&path).await)?;

        progress.advance(LifecycleState::Executing);
        let outcome = progress.track(self.delete_files(path).await)?;

        progress.advance(LifecycleState::Done);
        Ok(outcome)
    }

    async fn delete_files(&self, path: PathBuf) -> Result<LifecycleOutcome> {
        if !tokio::fs::try_exists(&path).await? {
            info!("Database {} does not exist, nothing to drop", path.display());
            return Ok(LifecycleOutcome::NoOp(path));
        }

        tokio::fs::remove_file(&path).await?;
        info!("Deleted database {}", path.display());

        for lock in lock_files(&path) {
            match tokio::fs::remove_file(&lock).await {
                Ok(()) => info!("Deleted lock file {}", lock.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No lock file at {}", lock.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(LifecycleOutcome::Dropped(path))
    }

    /// Whether the database named by a file name or connection string exists.
    pub async fn database_exists(&self, target: &str) -> Result<bool> {
        let path = self.resolve_target(target)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
