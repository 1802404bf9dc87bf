//! Splitting command lists around database lifecycle commands.
//!
//! A lifecycle command cannot share an execution batch with other
//! statements: it replaces the file the rest of the batch runs against.
//! [`partition`] gives each lifecycle command a batch of its own and groups
//! the runs of ordinary commands between them:
//!
//! ```text
//! [A, B, CREATE DATABASE 'x', C, D]  ->  [[A, B], [CREATE DATABASE 'x'], [C, D]]
//! ```

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, ShimError};
use crate::interceptor::{CommandInterceptor, CommandOutcome};
use crate::pattern::is_database_command;

/// Split commands so that every item matching `isolate` is alone in its batch.
///
/// Order is preserved and concatenating the batches gives back the input.
pub fn partition_by<T, F>(commands: impl IntoIterator<Item = T>, isolate: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> bool,
{
    let mut batches = Vec::new();
    let mut current = Vec::new();

    for command in commands {
        if isolate(&command) {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            batches.push(vec![command]);
        } else {
            current.push(command);
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Split commands around `CREATE DATABASE` / `DROP DATABASE`.
pub fn partition<T: AsRef<str>>(commands: impl IntoIterator<Item = T>) -> Vec<Vec<T>> {
    partition_by(commands, |command| is_database_command(command.as_ref()))
}

fn is_lifecycle_batch<S: AsRef<str>>(batch: &[S]) -> bool {
    matches!(batch, [only] if is_database_command(only.as_ref()))
}

/// Runs migration scripts batch by batch.
///
/// Ordinary batches run inside a driver transaction that is rolled back when
/// any command fails. Lifecycle batches run outside any transaction.
pub struct MigrationBatchExecutor<'a> {
    interceptor: &'a CommandInterceptor,
}

impl<'a> MigrationBatchExecutor<'a> {
    pub fn new(interceptor: &'a CommandInterceptor) -> Self {
        Self { interceptor }
    }

    async fn run(&self, command: &str, cancel: Option<&CancellationToken>) -> Result<CommandOutcome> {
        match cancel {
            Some(token) => self.interceptor.execute_with_cancel(command, token).await,
            None => self.interceptor.execute(command).await,
        }
    }

    /// Execute every command, stopping at the first failure.
    pub async fn execute_all<S: AsRef<str>>(
        &self,
        commands: &[S],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<CommandOutcome>> {
        let batches: Vec<Vec<&str>> = partition(commands.iter().map(|c| c.as_ref()));
        info!(
            "Executing {} commands in {} batches",
            commands.len(),
            batches.len()
        );

        let mut outcomes = Vec::with_capacity(commands.len());
        for (i, batch) in batches.iter().enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                info!("Cancellation requested, stopping before batch {}", i + 1);
                return Err(ShimError::Cancelled);
            }

            if is_lifecycle_batch(batch.as_slice()) {
                debug!("Batch {}: lifecycle command outside transaction", i + 1);
                outcomes.push(self.run(batch[0], cancel).await?);
                continue;
            }

            debug!("Batch {}: {} commands in a transaction", i + 1, batch.len());
            let conn = self.interceptor.connection();
            conn.begin_transaction().await?;

            for command in batch {
                match self.run(command, cancel).await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => {
                        if let Err(rollback) = conn.rollback().await {
                            warn!("Rollback after failed batch {} failed: {}", i + 1, rollback);
                        }
                        return Err(e);
                    }
                }
            }

            conn.commit().await?;
        }

        Ok(outcomes)
    }
}
