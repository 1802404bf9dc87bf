//! Core abstractions shared by every interception path.
//!
//! - [`value`]: Cell values and column definitions for snapshots
//! - [`schema`]: Typed catalog records produced by a schema provider
//! - [`identifier`]: Identifier validation and quoting rules
//! - [`traits`]: Interfaces to the driver, schema provider, pool registry and engine

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{
    CheckConstraintInfo, ColumnInfo, IndexColumnInfo, IndexInfo, IndexType, ReferentialAction,
    RelationColumnInfo, RelationInfo, TableInfo, TableType,
};
pub use traits::{DriverConnection, NativeResult, NoPooling, PoolManager, SchemaProvider, StoreEngine};
pub use value::{ColumnDef, ColumnType, Row, Value};
