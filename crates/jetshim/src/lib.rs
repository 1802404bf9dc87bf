//! # jetshim
//!
//! Command interception for desktop database engines in the Jet/ACE family
//! (`.mdb` / `.accdb` files).
//!
//! The engine lacks several statements that schema tooling takes for granted.
//! This library recognizes them in outgoing command text and carries them
//! out another way:
//!
//! - **Catalog queries** against `INFORMATION_SCHEMA` objects, answered from
//!   native schema reads and filtered in memory
//! - **`CREATE DATABASE` / `DROP DATABASE`**, performed on the file system
//! - **`ALTER TABLE ... RENAME`**, performed through the schema provider
//! - **Batch partitioning** so lifecycle commands run alone
//!
//! Everything else is forwarded to the driver unchanged.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jetshim::{CommandInterceptor, CommandOutcome, NoPooling, ShimConfig};
//!
//! let shim = CommandInterceptor::new(connection, provider, Arc::new(NoPooling), engine, ShimConfig::default());
//! if let CommandOutcome::Rows(rows) = shim
//!     .execute("SELECT * FROM `INFORMATION_SCHEMA.TABLES` ORDER BY TABLE_NAME")
//!     .await?
//! {
//!     for row in rows {
//!         println!("{:?}", row);
//!     }
//! }
//! ```

pub mod batch;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod lifecycle;
pub mod pattern;
pub mod rename;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use batch::{partition, partition_by, MigrationBatchExecutor};
pub use catalog::{build_snapshot, CatalogObject, SnapshotTable};
pub use config::ShimConfig;
pub use crate::core::{
    ColumnDef, ColumnType, DriverConnection, NativeResult, NoPooling, PoolManager, Row,
    SchemaProvider, StoreEngine, Value,
};
pub use error::{Result, ShimError};
pub use filter::Cursor;
pub use interceptor::blocking::BlockingInterceptor;
pub use interceptor::{CommandInterceptor, CommandOutcome};
pub use lifecycle::{LifecycleExecutor, LifecycleOutcome, LifecycleState, StorageFormat};
pub use pattern::{classify, Classified, Intercepted, LifecycleRequest, PatternKind};
pub use rename::RenameExecutor;
