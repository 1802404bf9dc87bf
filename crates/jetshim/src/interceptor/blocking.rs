//! Synchronous surface over [`CommandInterceptor`].
//!
//! Callers without an async runtime drive the interceptor through a private
//! current-thread runtime. Each call blocks until the command completes; the
//! flow and ordering of effects are those of the async interceptor.
//!
//! Must not be used from inside another tokio runtime.

use tokio::runtime::{Builder, Runtime};

use super::{CommandInterceptor, CommandOutcome};
use crate::batch::MigrationBatchExecutor;
use crate::error::Result;
use crate::pattern::Classified;

pub struct BlockingInterceptor {
    inner: CommandInterceptor,
    runtime: Runtime,
}

impl BlockingInterceptor {
    pub fn new(inner: CommandInterceptor) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn inner(&self) -> &CommandInterceptor {
        &self.inner
    }

    pub fn classify(&self, text: &str) -> Result<Option<Classified>> {
        self.inner.classify(text)
    }

    /// Execute one command to completion.
    pub fn execute(&self, text: &str) -> Result<CommandOutcome> {
        self.runtime.block_on(self.inner.execute(text))
    }

    /// Execute a command list, isolating lifecycle commands.
    pub fn execute_batch<S: AsRef<str>>(&self, commands: &[S]) -> Result<Vec<CommandOutcome>> {
        let executor = MigrationBatchExecutor::new(&self.inner);
        self.runtime.block_on(executor.execute_all(commands, None))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ShimConfig;
    use crate::core::{NoPooling, StoreEngine};
    use crate::lifecycle::{LifecycleOutcome, StorageFormat};
    use crate::testing::{Behavior, FakeConnection, FakeProvider};

    struct FileEngine;

    #[async_trait]
    impl StoreEngine for FileEngine {
        async fn create_database(
            &self,
            path: &Path,
            _password: Option<&str>,
            _format: StorageFormat,
        ) -> Result<()> {
            tokio::fs::write(path, b"").await?;
            Ok(())
        }
    }

    #[test]
    fn test_blocking_lifecycle_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Arc::new(FakeConnection::opened());
        let shim = BlockingInterceptor::new(CommandInterceptor::new(
            conn.clone(),
            Arc::new(FakeProvider::new(Behavior::Answer)),
            Arc::new(NoPooling),
            Arc::new(FileEngine),
            ShimConfig::default().with_data_directory(dir.path()),
        ))
        .unwrap();

        let created = shim
            .execute("CREATE DATABASE '|DataDirectory|/Blocking'")
            .unwrap();
        let expected = dir.path().join("Blocking.accdb");
        assert!(matches!(
            created,
            CommandOutcome::Lifecycle(LifecycleOutcome::Created(ref p)) if *p == expected
        ));
        assert!(expected.exists());

        let dropped = shim
            .execute("DROP DATABASE '|DataDirectory|/Blocking.accdb'")
            .unwrap();
        assert!(matches!(
            dropped,
            CommandOutcome::Lifecycle(LifecycleOutcome::Dropped(_))
        ));
        assert!(!expected.exists());
        assert!(conn.log().is_empty());
    }

    #[test]
    fn test_blocking_batch() {
        let conn = Arc::new(FakeConnection::opened());
        let shim = BlockingInterceptor::new(CommandInterceptor::new(
            conn.clone(),
            Arc::new(FakeProvider::new(Behavior::Answer)),
            Arc::new(NoPooling),
            Arc::new(FileEngine),
            ShimConfig::default(),
        ))
        .unwrap();

        let outcomes = shim.execute_batch(&["UPDATE a SET x = 1", "UPDATE b SET y = 2"]).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            conn.log(),
            ["begin", "exec UPDATE a SET x = 1", "exec UPDATE b SET y = 2", "commit"]
        );
    }
}
