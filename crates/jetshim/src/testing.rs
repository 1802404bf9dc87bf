//! In-memory fakes for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{
    CheckConstraintInfo, ColumnInfo, DriverConnection, IndexColumnInfo, IndexInfo, IndexType,
    NativeResult, ReferentialAction, RelationColumnInfo, RelationInfo, SchemaProvider, TableInfo,
    TableType,
};
use crate::error::{Result, ShimError};

/// Connection that records what was run against it.
#[derive(Default)]
pub(crate) struct FakeConnection {
    pub open: AtomicBool,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub log: Mutex<Vec<String>>,
    pub fail_command: Option<String>,
}

impl FakeConnection {
    pub fn opened() -> Self {
        let conn = Self::default();
        conn.open.store(true, Ordering::SeqCst);
        conn
    }

    pub fn failing_on(command: &str) -> Self {
        Self {
            fail_command: Some(command.to_string()),
            ..Self::opened()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl DriverConnection for FakeConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn execute(&self, command: &str) -> Result<NativeResult> {
        self.record(format!("exec {}", command));
        if self.fail_command.as_deref() == Some(command) {
            return Err(ShimError::driver(
                "execute",
                std::io::Error::new(std::io::ErrorKind::Other, "syntax error"),
            ));
        }
        Ok(NativeResult::RowsAffected(1))
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.record("begin".to_string());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.record("commit".to_string());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.record("rollback".to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Answer,
    Fail,
    Hang,
}

/// Schema provider serving a two-table fixture.
pub(crate) struct FakeProvider {
    pub behavior: Behavior,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn gate(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.behavior {
            Behavior::Answer => Ok(()),
            Behavior::Fail => Err(ShimError::provider(
                "catalog",
                std::io::Error::new(std::io::ErrorKind::Other, "catalog locked"),
            )),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

fn column(table: &str, name: &str, position: i32, data_type: &str, nullable: bool) -> ColumnInfo {
    ColumnInfo {
        table_name: table.into(),
        table_schema: None,
        name: name.into(),
        ordinal_position: position,
        data_type: data_type.into(),
        is_nullable: nullable,
        max_length: (data_type == "varchar").then_some(255),
        precision: (data_type == "integer").then_some(10),
        scale: (data_type == "integer").then_some(0),
        default: None,
        identity_seed: (name == "Id").then_some(1),
        identity_increment: (name == "Id").then_some(1),
    }
}

#[async_trait]
impl SchemaProvider for FakeProvider {
    async fn get_tables(&self, _conn: &dyn DriverConnection) -> Result<Vec<TableInfo>> {
        self.gate("get_tables".into()).await?;
        Ok(["Orders", "Customers"]
            .into_iter()
            .map(|name| TableInfo {
                name: name.into(),
                table_type: TableType::BaseTable,
                validation_rule: None,
                validation_text: None,
            })
            .collect())
    }

    async fn get_columns(&self, _conn: &dyn DriverConnection) -> Result<Vec<ColumnInfo>> {
        self.gate("get_columns".into()).await?;
        Ok(vec![
            column("Orders", "Id", 1, "integer", false),
            column("Orders", "Total", 2, "currency", true),
            column("Orders", "CustomerId", 3, "integer", true),
            column("Customers", "Id", 1, "integer", false),
            column("Customers", "Name", 2, "varchar", true),
        ])
    }

    async fn get_indexes(&self, _conn: &dyn DriverConnection) -> Result<Vec<IndexInfo>> {
        self.gate("get_indexes".into()).await?;
        Ok(vec![IndexInfo {
            table_name: "Orders".into(),
            name: "PrimaryKey".into(),
            index_type: IndexType::PrimaryKey,
            is_nullable: false,
            ignores_nulls: false,
        }])
    }

    async fn get_index_columns(&self, _conn: &dyn DriverConnection) -> Result<Vec<IndexColumnInfo>> {
        self.gate("get_index_columns".into()).await?;
        Ok(vec![IndexColumnInfo {
            table_name: "Orders".into(),
            index_name: "PrimaryKey".into(),
            ordinal_position: 1,
            column_name: "Id".into(),
            is_descending: false,
        }])
    }

    async fn get_relations(&self, _conn: &dyn DriverConnection) -> Result<Vec<RelationInfo>> {
        self.gate("get_relations".into()).await?;
        Ok(vec![RelationInfo {
            name: "CustomersOrders".into(),
            referencing_table: "Orders".into(),
            principal_table: "Customers".into(),
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::NoAction,
            is_enforced: true,
            is_inherited: false,
        }])
    }

    async fn get_relation_columns(
        &self,
        _conn: &dyn DriverConnection,
    ) -> Result<Vec<RelationColumnInfo>> {
        self.gate("get_relation_columns".into()).await?;
        Ok(vec![RelationColumnInfo {
            relation_name: "CustomersOrders".into(),
            referencing_column: "CustomerId".into(),
            principal_column: "Id".into(),
            ordinal_position: 1,
        }])
    }

    async fn get_check_constraints(
        &self,
        _conn: &dyn DriverConnection,
    ) -> Result<Vec<CheckConstraintInfo>> {
        self.gate("get_check_constraints".into()).await?;
        Ok(vec![CheckConstraintInfo {
            table_name: "Orders".into(),
            name: "PositiveTotal".into(),
            check_clause: "Total >= 0".into(),
        }])
    }

    async fn rename_table(
        &self,
        _conn: &dyn DriverConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        self.gate(format!("rename_table {} -> {}", old_name, new_name))
            .await
    }

    async fn rename_column(
        &self,
        _conn: &dyn DriverConnection,
        table_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        self.gate(format!(
            "rename_column {}.{} -> {}",
            table_name, old_name, new_name
        ))
        .await
    }
}
