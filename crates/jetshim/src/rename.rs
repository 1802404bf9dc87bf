//! Catalog-level table and column renames.
//!
//! The engine has no `RENAME` DDL; the schema provider renames objects in the
//! catalog directly. Each request is exactly one provider call, with no retry
//! and nothing to roll back.

use std::sync::Arc;

use tracing::info;

use crate::catalog::snapshot::OpenScope;
use crate::core::identifier::{quote_identifier, validate_identifier};
use crate::core::{DriverConnection, SchemaProvider};
use crate::error::Result;

/// Runs `ALTER TABLE ... RENAME` requests against a schema provider.
#[derive(Clone)]
pub struct RenameExecutor {
    provider: Arc<dyn SchemaProvider>,
}

impl RenameExecutor {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self { provider }
    }

    /// `ALTER TABLE old RENAME TO new`
    pub async fn rename_table(
        &self,
        conn: &dyn DriverConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let (old_quoted, new_quoted) = (quote_identifier(old_name)?, quote_identifier(new_name)?);

        let _scope = OpenScope::enter(conn).await?;
        self.provider.rename_table(conn, old_name, new_name).await?;

        info!("Renamed table {} to {}", old_quoted, new_quoted);
        Ok(())
    }

    /// `ALTER TABLE table RENAME COLUMN old TO new`
    pub async fn rename_column(
        &self,
        conn: &dyn DriverConnection,
        table_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let table_quoted = quote_identifier(table_name)?;
        validate_identifier(old_name)?;
        validate_identifier(new_name)?;

        let _scope = OpenScope::enter(conn).await?;
        self.provider
            .rename_column(conn, table_name, old_name, new_name)
            .await?;

        info!(
            "Renamed column {}.[{}] to [{}]",
            table_quoted, old_name, new_name
        );
        Ok(())
    }
}
