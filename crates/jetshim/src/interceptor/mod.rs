//! The command interception entry point.
//!
//! Every command issued against the engine goes through
//! [`CommandInterceptor::execute`]. Recognized pseudo-SQL is carried out by
//! the matching executor; everything else is forwarded to the driver
//! connection untouched.
//!
//! ```text
//! catalog query  -> snapshot -> filter -> Cursor
//! lifecycle      -> resolver -> lifecycle executor
//! rename         -> rename executor
//! anything else  -> driver
//! ```

pub mod blocking;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::build_snapshot;
use crate::config::ShimConfig;
use crate::core::{DriverConnection, NativeResult, PoolManager, SchemaProvider, StoreEngine};
use crate::error::{Result, ShimError};
use crate::filter::{self, Cursor};
use crate::lifecycle::{LifecycleExecutor, LifecycleOutcome};
use crate::pattern::{self, Classified, Intercepted};
use crate::rename::RenameExecutor;

/// What an executed command produced.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Catalog query result.
    Rows(Cursor),
    /// Database created, dropped, or drop of a missing file.
    Lifecycle(LifecycleOutcome),
    /// Table or column renamed.
    Renamed,
    /// Result of a command forwarded to the driver.
    Native(NativeResult),
}

impl CommandOutcome {
    /// Whether the command was handled without reaching the driver.
    pub fn is_intercepted(&self) -> bool {
        !matches!(self, CommandOutcome::Native(_))
    }
}

/// Routes command text to the executor that can carry it out.
#[derive(Clone)]
pub struct CommandInterceptor {
    connection: Arc<dyn DriverConnection>,
    schema: Arc<dyn SchemaProvider>,
    lifecycle: LifecycleExecutor,
    rename: RenameExecutor,
}

impl CommandInterceptor {
    pub fn new(
        connection: Arc<dyn DriverConnection>,
        schema: Arc<dyn SchemaProvider>,
        pools: Arc<dyn PoolManager>,
        engine: Arc<dyn StoreEngine>,
        config: ShimConfig,
    ) -> Self {
        Self {
            connection,
            rename: RenameExecutor::new(schema.clone()),
            schema,
            lifecycle: LifecycleExecutor::new(pools, engine, config),
        }
    }

    /// The driver connection passthrough commands run on.
    pub fn connection(&self) -> &dyn DriverConnection {
        self.connection.as_ref()
    }

    pub fn lifecycle(&self) -> &LifecycleExecutor {
        &self.lifecycle
    }

    /// Classify without executing.
    pub fn classify(&self, text: &str) -> Result<Option<Classified>> {
        pattern::classify(text)
    }

    /// Execute one command.
    pub async fn execute(&self, text: &str) -> Result<CommandOutcome> {
        match pattern::classify(text)? {
            Some(classified) => {
                debug!("Intercepted {:?} command", classified.kind);
                self.dispatch(classified.request).await
            }
            None => {
                debug!("Passing command through to driver");
                let result = self.connection.execute(text).await?;
                Ok(CommandOutcome::Native(result))
            }
        }
    }

    /// Execute one command, abandoning it when `cancel` fires.
    ///
    /// The pending I/O future is dropped on cancellation, so scoped resources
    /// such as a connection opened for a catalog query are still released.
    pub async fn execute_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome> {
        if cancel.is_cancelled() {
            return Err(ShimError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancellation requested, abandoning command");
                Err(ShimError::Cancelled)
            }
            result = self.execute(text) => result,
        }
    }

    async fn dispatch(&self, request: Intercepted) -> Result<CommandOutcome> {
        let conn = self.connection.as_ref();
        match request {
            Intercepted::Catalog(query) => {
                let snapshot = build_snapshot(query.object, conn, self.schema.as_ref()).await?;
                let cursor = filter::apply(snapshot, query.filter.as_deref(), query.order.as_deref())?;
                debug!("{} query returned {} rows", query.object, cursor.remaining());
                Ok(CommandOutcome::Rows(cursor))
            }
            Intercepted::Lifecycle(request) => {
                Ok(CommandOutcome::Lifecycle(self.lifecycle.execute(&request).await?))
            }
            Intercepted::RenameTable { old_name, new_name } => {
                self.rename.rename_table(conn, &old_name, &new_name).await?;
                Ok(CommandOutcome::Renamed)
            }
            Intercepted::RenameColumn {
                table_name,
                old_name,
                new_name,
            } => {
                self.rename
                    .rename_column(conn, &table_name, &old_name, &new_name)
                    .await?;
                Ok(CommandOutcome::Renamed)
            }
        }
    }
}
