//! End-to-end interception tests against in-memory collaborators.
//!
//! The fakes record every call so the tests can check which component a
//! command reached and in what order effects happened.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jetshim::core::{
    CheckConstraintInfo, ColumnInfo, IndexColumnInfo, IndexInfo, RelationColumnInfo, RelationInfo,
    TableInfo, TableType,
};
use jetshim::{
    classify, partition, CommandInterceptor, CommandOutcome, DriverConnection, Intercepted,
    LifecycleOutcome, LifecycleRequest, NativeResult, PoolManager, Result, SchemaProvider,
    ShimConfig, ShimError, StorageFormat, StoreEngine, Value,
};

type Events = Arc<Mutex<Vec<String>>>;

fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(events: &Events, entry: impl Into<String>) {
    events.lock().unwrap().push(entry.into());
}

// =============================================================================
// Fakes
// =============================================================================

struct Connection {
    open: AtomicBool,
    events: Events,
}

#[async_trait]
impl DriverConnection for Connection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<()> {
        push(&self.events, "open");
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            push(&self.events, "close");
        }
    }

    async fn execute(&self, command: &str) -> Result<NativeResult> {
        push(&self.events, format!("execute {}", command));
        Ok(NativeResult::RowsAffected(0))
    }

    async fn begin_transaction(&self) -> Result<()> {
        push(&self.events, "begin");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        push(&self.events, "commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        push(&self.events, "rollback");
        Ok(())
    }
}

/// Catalog with tables `Foo` and `Bar`.
struct Catalog {
    events: Events,
}

fn column(table: &str, name: &str, position: i32) -> ColumnInfo {
    ColumnInfo {
        table_name: table.to_string(),
        table_schema: None,
        name: name.to_string(),
        ordinal_position: position,
        data_type: "varchar".to_string(),
        is_nullable: true,
        max_length: Some(255),
        precision: None,
        scale: None,
        default: None,
        identity_seed: None,
        identity_increment: None,
    }
}

#[async_trait]
impl SchemaProvider for Catalog {
    async fn get_tables(&self, _conn: &dyn DriverConnection) -> Result<Vec<TableInfo>> {
        push(&self.events, "get_tables");
        Ok(["Foo", "Bar"]
            .into_iter()
            .map(|name| TableInfo {
                name: name.to_string(),
                table_type: TableType::BaseTable,
                validation_rule: None,
                validation_text: None,
            })
            .collect())
    }

    async fn get_columns(&self, _conn: &dyn DriverConnection) -> Result<Vec<ColumnInfo>> {
        push(&self.events, "get_columns");
        Ok(vec![
            column("Foo", "Zeta", 1),
            column("Bar", "Alpha", 1),
            column("Foo", "Beta", 2),
            column("Foo", "Gamma", 3),
            column("Bar", "Delta", 2),
        ])
    }

    async fn get_indexes(&self, _conn: &dyn DriverConnection) -> Result<Vec<IndexInfo>> {
        Ok(Vec::new())
    }

    async fn get_index_columns(&self, _conn: &dyn DriverConnection) -> Result<Vec<IndexColumnInfo>> {
        Ok(Vec::new())
    }

    async fn get_relations(&self, _conn: &dyn DriverConnection) -> Result<Vec<RelationInfo>> {
        Ok(Vec::new())
    }

    async fn get_relation_columns(
        &self,
        _conn: &dyn DriverConnection,
    ) -> Result<Vec<RelationColumnInfo>> {
        Ok(Vec::new())
    }

    async fn get_check_constraints(
        &self,
        _conn: &dyn DriverConnection,
    ) -> Result<Vec<CheckConstraintInfo>> {
        Ok(Vec::new())
    }

    async fn rename_table(
        &self,
        _conn: &dyn DriverConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        push(&self.events, format!("rename_table {} -> {}", old_name, new_name));
        Ok(())
    }

    async fn rename_column(
        &self,
        _conn: &dyn DriverConnection,
        table_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        push(
            &self.events,
            format!("rename_column {}.{} -> {}", table_name, old_name, new_name),
        );
        Ok(())
    }
}

/// Pool registry that records whether the target still existed when drained.
struct Pools {
    events: Events,
}

#[async_trait]
impl PoolManager for Pools {
    async fn clear_all_pools(&self) -> Result<()> {
        push(&self.events, "clear_all_pools");
        Ok(())
    }

    async fn clear_pool(&self, data_source: &Path) -> Result<()> {
        push(
            &self.events,
            format!("clear_pool exists={}", data_source.exists()),
        );
        Ok(())
    }
}

struct Engine {
    events: Events,
}

#[async_trait]
impl StoreEngine for Engine {
    async fn create_database(
        &self,
        path: &Path,
        password: Option<&str>,
        format: StorageFormat,
    ) -> Result<()> {
        push(
            &self.events,
            format!(
                "create {} password={:?} format={:?}",
                path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
                password,
                format
            ),
        );
        tokio::fs::write(path, b"").await?;
        Ok(())
    }
}

struct Harness {
    shim: CommandInterceptor,
    events: Events,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let events = events();
        let dir = tempfile::tempdir().unwrap();
        let shim = CommandInterceptor::new(
            Arc::new(Connection {
                open: AtomicBool::new(false),
                events: events.clone(),
            }),
            Arc::new(Catalog {
                events: events.clone(),
            }),
            Arc::new(Pools {
                events: events.clone(),
            }),
            Arc::new(Engine {
                events: events.clone(),
            }),
            ShimConfig::default().with_data_directory(dir.path()),
        );
        Self { shim, events, dir }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_create_database_with_escaped_quotes() {
    let classified = classify("create database 'Joe''s Database.accdb' password 'sec''ret';")
        .unwrap()
        .unwrap();
    assert_eq!(
        classified.request,
        Intercepted::Lifecycle(LifecycleRequest::Create {
            file_name: "Joe's Database.accdb".to_string(),
            password: Some("sec'ret".to_string()),
        })
    );

    let h = Harness::new();
    let outcome = h
        .shim
        .execute("create database '|DataDirectory|/Joe''s Database.accdb' password 'sec''ret';")
        .await
        .unwrap();

    let expected = h.path("Joe's Database.accdb");
    assert!(matches!(
        outcome,
        CommandOutcome::Lifecycle(LifecycleOutcome::Created(ref p)) if *p == expected
    ));
    assert!(expected.exists());
    assert_eq!(
        h.events(),
        ["create Joe's Database.accdb password=Some(\"sec'ret\") format=Modern"]
    );
}

#[tokio::test]
async fn test_drop_missing_database_is_noop() {
    let h = Harness::new();
    let outcome = h
        .shim
        .execute("DROP DATABASE '|DataDirectory|/Missing.accdb';")
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::Lifecycle(LifecycleOutcome::NoOp(_))
    ));
    assert_eq!(h.events(), ["clear_pool exists=false"]);
}

#[tokio::test]
async fn test_drop_drains_pool_before_delete() {
    let h = Harness::new();
    let db = h.path("Sales.accdb");
    let lock = h.path("Sales.laccdb");
    std::fs::write(&db, b"db").unwrap();
    std::fs::write(&lock, b"lock").unwrap();

    let outcome = h
        .shim
        .execute("DROP DATABASE 'Provider=Microsoft.ACE.OLEDB.12.0;Data Source=|DataDirectory|/Sales.accdb'")
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        CommandOutcome::Lifecycle(LifecycleOutcome::Dropped(_))
    ));
    assert_eq!(h.events(), ["clear_pool exists=true"]);
    assert!(!db.exists());
    assert!(!lock.exists());
}

#[tokio::test]
async fn test_rename_table_with_brackets() {
    let h = Harness::new();
    let outcome = h
        .shim
        .execute("ALTER TABLE [Old Name] RENAME TO [New Name]")
        .await
        .unwrap();

    assert!(matches!(outcome, CommandOutcome::Renamed));
    assert_eq!(
        h.events(),
        ["open", "rename_table Old Name -> New Name", "close"]
    );
}

#[tokio::test]
async fn test_rename_column() {
    let h = Harness::new();
    h.shim
        .execute("ALTER TABLE `Foo` RENAME COLUMN Beta TO [Bravo];")
        .await
        .unwrap();
    assert!(h.events().contains(&"rename_column Foo.Beta -> Bravo".to_string()));
}

#[test]
fn test_partition_script() {
    let batches = partition(["A", "B", "CREATE DATABASE 'x.accdb'", "C", "D"]);
    assert_eq!(
        batches,
        vec![vec!["A", "B"], vec!["CREATE DATABASE 'x.accdb'"], vec!["C", "D"]]
    );
}

#[tokio::test]
async fn test_columns_query_filtered_and_ordered() {
    let h = Harness::new();
    let outcome = h
        .shim
        .execute("SELECT * FROM `INFORMATION_SCHEMA.COLUMNS` WHERE `TABLE_NAME`='Foo' ORDER BY `COLUMN_NAME`")
        .await
        .unwrap();

    let CommandOutcome::Rows(cursor) = outcome else {
        panic!("expected rows");
    };
    assert_eq!(cursor.columns().len(), 12);
    let table = cursor.column_index("TABLE_NAME").unwrap();
    let name = cursor.column_index("COLUMN_NAME").unwrap();

    let rows: Vec<_> = cursor.collect();
    assert!(rows.iter().all(|row| row[table] == Value::from("Foo")));
    let names: Vec<_> = rows.iter().map(|row| row[name].clone()).collect();
    assert_eq!(
        names,
        vec![Value::from("Beta"), Value::from("Gamma"), Value::from("Zeta")]
    );

    // Closed connection was opened for the snapshot and closed again
    assert_eq!(h.events(), ["open", "get_columns", "close"]);
}

// =============================================================================
// Passthrough and errors
// =============================================================================

#[tokio::test]
async fn test_ordinary_command_passes_through() {
    let h = Harness::new();
    let outcome = h.shim.execute("UPDATE Foo SET Zeta = 1").await.unwrap();
    assert!(!outcome.is_intercepted());
    assert_eq!(h.events(), ["execute UPDATE Foo SET Zeta = 1"]);
}

#[tokio::test]
async fn test_blank_file_name_has_no_effects() {
    let h = Harness::new();
    let err = h.shim.execute("DROP DATABASE ''").await.unwrap_err();
    assert!(matches!(err, ShimError::MissingField { .. }));
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn test_bad_filter_is_usage_error() {
    let h = Harness::new();
    let err = h
        .shim
        .execute("SELECT * FROM `INFORMATION_SCHEMA.TABLES` WHERE TABLE_NAME")
        .await
        .unwrap_err();
    assert!(err.is_usage_error());
    // The connection is still released
    assert_eq!(h.events(), ["open", "get_tables", "close"]);
}

#[tokio::test]
async fn test_database_exists_uses_drop_resolution() {
    let h = Harness::new();
    std::fs::write(h.path("Here.mdb"), b"db").unwrap();

    let lifecycle = h.shim.lifecycle();
    assert!(lifecycle
        .database_exists("Data Source=|DataDirectory|/Here.mdb")
        .await
        .unwrap());
    assert!(!lifecycle
        .database_exists("|DataDirectory|/Here")
        .await
        .unwrap());
}
