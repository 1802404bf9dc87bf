//! Snapshot construction for each catalog object.

use tracing::debug;

use super::{CatalogObject, SnapshotTable};
use crate::core::{
    CheckConstraintInfo, ColumnInfo, DriverConnection, IndexColumnInfo, IndexInfo,
    RelationColumnInfo, RelationInfo, Row, SchemaProvider, TableInfo,
};
use crate::error::Result;

/// Keeps a connection open for one operation, closing it again on every exit
/// path if this scope was the one that opened it.
pub(crate) struct OpenScope<'a> {
    conn: &'a dyn DriverConnection,
    opened_here: bool,
}

impl<'a> OpenScope<'a> {
    pub(crate) async fn enter(conn: &'a dyn DriverConnection) -> Result<Self> {
        if conn.is_open() {
            return Ok(Self {
                conn,
                opened_here: false,
            });
        }

        // Guard exists before the open is awaited so a dropped future still closes
        let scope = Self {
            conn,
            opened_here: true,
        };
        conn.open().await?;
        Ok(scope)
    }
}

impl Drop for OpenScope<'_> {
    fn drop(&mut self) {
        if self.opened_here {
            debug!("Closing connection opened for intercepted command");
            self.conn.close();
        }
    }
}

fn table_row(t: TableInfo) -> Row {
    vec![
        t.name.into(),
        t.table_type.as_str().into(),
        t.validation_rule.into(),
        t.validation_text.into(),
    ]
}

fn column_row(c: ColumnInfo) -> Row {
    vec![
        c.table_name.into(),
        c.table_schema.into(),
        c.name.into(),
        c.ordinal_position.into(),
        c.data_type.into(),
        c.is_nullable.into(),
        c.max_length.into(),
        c.precision.into(),
        c.scale.into(),
        c.default.into(),
        c.identity_seed.into(),
        c.identity_increment.into(),
    ]
}

fn index_row(i: IndexInfo) -> Row {
    vec![
        i.table_name.into(),
        i.name.into(),
        i.index_type.as_str().into(),
        i.is_nullable.into(),
        i.ignores_nulls.into(),
    ]
}

fn index_column_row(c: IndexColumnInfo) -> Row {
    vec![
        c.table_name.into(),
        c.index_name.into(),
        c.ordinal_position.into(),
        c.column_name.into(),
        c.is_descending.into(),
    ]
}

fn relation_row(r: RelationInfo) -> Row {
    vec![
        r.name.into(),
        r.referencing_table.into(),
        r.principal_table.into(),
        r.on_delete.as_str().into(),
        r.on_update.as_str().into(),
        r.is_enforced.into(),
        r.is_inherited.into(),
    ]
}

fn relation_column_row(c: RelationColumnInfo) -> Row {
    vec![
        c.relation_name.into(),
        c.referencing_column.into(),
        c.principal_column.into(),
        c.ordinal_position.into(),
    ]
}

fn check_constraint_row(c: CheckConstraintInfo) -> Row {
    vec![c.table_name.into(), c.name.into(), c.check_clause.into()]
}

fn rows<T>(records: Vec<T>, shape: fn(T) -> Row) -> Vec<Row> {
    records.into_iter().map(shape).collect()
}

/// Materialize one catalog object.
///
/// A closed connection is opened for the duration of the call and closed
/// again afterwards, including when the provider fails or the future is
/// dropped. Provider errors are returned unchanged.
pub async fn build_snapshot(
    object: CatalogObject,
    conn: &dyn DriverConnection,
    provider: &dyn SchemaProvider,
) -> Result<SnapshotTable> {
    let _scope = OpenScope::enter(conn).await?;

    let rows = match object {
        CatalogObject::Tables => rows(provider.get_tables(conn).await?, table_row),
        CatalogObject::Columns => rows(provider.get_columns(conn).await?, column_row),
        CatalogObject::Indexes => rows(provider.get_indexes(conn).await?, index_row),
        CatalogObject::IndexColumns => {
            rows(provider.get_index_columns(conn).await?, index_column_row)
        }
        CatalogObject::Relations => rows(provider.get_relations(conn).await?, relation_row),
        CatalogObject::RelationColumns => {
            rows(provider.get_relation_columns(conn).await?, relation_column_row)
        }
        CatalogObject::CheckConstraints => rows(
            provider.get_check_constraints(conn).await?,
            check_constraint_row,
        ),
    };

    debug!("Built {} snapshot with {} rows", object, rows.len());

    Ok(SnapshotTable {
        columns: object.columns(),
        rows,
    })
}
