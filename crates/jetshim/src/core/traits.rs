//! Interfaces consumed by the interception engine.
//!
//! The engine never talks to the desktop database directly. It is handed:
//!
//! - [`DriverConnection`]: the driver connection that runs passthrough text
//! - [`SchemaProvider`]: native catalog reads and physical renames
//! - [`PoolManager`]: the process-wide connection pool registry
//! - [`StoreEngine`]: physical creation of new database files
//!
//! Each is injected explicitly so tests can substitute in-memory fakes and
//! observe the exact order of calls.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::Cursor;
use crate::lifecycle::StorageFormat;

use super::schema::{
    CheckConstraintInfo, ColumnInfo, IndexColumnInfo, IndexInfo, RelationColumnInfo,
    RelationInfo, TableInfo,
};

/// Result of a command forwarded unchanged to the driver.
#[derive(Debug)]
pub enum NativeResult {
    /// Statement executed; number of rows it touched.
    RowsAffected(u64),
    /// Statement produced a result set.
    Rows(Cursor),
}

/// Driver connection to one database file.
///
/// Methods take `&self`; implementations keep their mutable state behind
/// interior mutability, the same way a pooled client does.
#[async_trait]
pub trait DriverConnection: Send + Sync {
    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Open the connection.
    async fn open(&self) -> Result<()>;

    /// Close the connection. Closing a closed connection does nothing.
    ///
    /// Synchronous so that scope guards can release the connection on drop.
    fn close(&self);

    /// Execute command text natively.
    async fn execute(&self, command: &str) -> Result<NativeResult>;

    /// Begin a transaction on this connection.
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the current transaction.
    async fn rollback(&self) -> Result<()>;
}

/// Native catalog access for one engine.
///
/// Every method runs against an open connection supplied by the caller.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// List tables and views.
    async fn get_tables(&self, conn: &dyn DriverConnection) -> Result<Vec<TableInfo>>;

    /// List columns of all tables.
    async fn get_columns(&self, conn: &dyn DriverConnection) -> Result<Vec<ColumnInfo>>;

    /// List indexes of all tables.
    async fn get_indexes(&self, conn: &dyn DriverConnection) -> Result<Vec<IndexInfo>>;

    /// List index key columns.
    async fn get_index_columns(&self, conn: &dyn DriverConnection)
        -> Result<Vec<IndexColumnInfo>>;

    /// List relations (foreign keys).
    async fn get_relations(&self, conn: &dyn DriverConnection) -> Result<Vec<RelationInfo>>;

    /// List relation column pairs.
    async fn get_relation_columns(
        &self,
        conn: &dyn DriverConnection,
    ) -> Result<Vec<RelationColumnInfo>>;

    /// List check constraints.
    async fn get_check_constraints(
        &self,
        conn: &dyn DriverConnection,
    ) -> Result<Vec<CheckConstraintInfo>>;

    /// Rename a table in the catalog.
    async fn rename_table(
        &self,
        conn: &dyn DriverConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<()>;

    /// Rename a column of a table in the catalog.
    async fn rename_column(
        &self,
        conn: &dyn DriverConnection,
        table_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()>;
}

/// Process-wide registry of pooled driver connections.
#[async_trait]
pub trait PoolManager: Send + Sync {
    /// Evict every pooled connection.
    async fn clear_all_pools(&self) -> Result<()>;

    /// Evict pooled connections to one database file.
    ///
    /// Defaults to clearing everything, which is always sufficient.
    async fn clear_pool(&self, _data_source: &Path) -> Result<()> {
        self.clear_all_pools().await
    }
}

/// Physical database file creation.
#[async_trait]
pub trait StoreEngine: Send + Sync {
    /// Create an empty database file at `path`.
    async fn create_database(
        &self,
        path: &Path,
        password: Option<&str>,
        format: StorageFormat,
    ) -> Result<()>;
}

/// Pool manager for processes that do not pool connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPooling;

#[async_trait]
impl PoolManager for NoPooling {
    async fn clear_all_pools(&self) -> Result<()> {
        Ok(())
    }
}
