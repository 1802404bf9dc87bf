//! In-memory filtering and ordering of catalog snapshots.
//!
//! A snapshot is small (one row per table, column, index...) so the `WHERE`
//! and `ORDER BY` clauses of a catalog query are evaluated here rather than
//! pushed down to the engine, which cannot answer them natively.

mod expr;

use serde::Serialize;

use crate::catalog::SnapshotTable;
use crate::core::{ColumnDef, Row};
use crate::error::Result;

use expr::{compare_rows, parse_sort_keys, Predicate};

/// Forward-only cursor over filtered rows.
#[derive(Debug, Clone, Serialize)]
pub struct Cursor {
    columns: Vec<ColumnDef>,
    rows: std::collections::VecDeque<Row>,
}

impl Cursor {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Column layout of every row.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Drain the remaining rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows.into()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}

impl ExactSizeIterator for Cursor {}

impl From<SnapshotTable> for Cursor {
    fn from(table: SnapshotTable) -> Self {
        Cursor::new(table.columns, table.rows)
    }
}

fn clause(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Filter then sort a snapshot.
///
/// With neither clause the snapshot rows are handed to the cursor as they
/// are. The sort is stable, so rows with equal keys keep snapshot order.
pub fn apply(table: SnapshotTable, filter: Option<&str>, order: Option<&str>) -> Result<Cursor> {
    let (filter, order) = (clause(filter), clause(order));
    if filter.is_none() && order.is_none() {
        return Ok(Cursor::from(table));
    }

    let SnapshotTable { columns, rows } = table;

    let mut rows = match filter {
        Some(text) => {
            let predicate = Predicate::parse(text, &columns)?;
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if predicate.matches(&row)? {
                    kept.push(row);
                }
            }
            kept
        }
        None => rows,
    };

    if let Some(text) = order {
        let keys = parse_sort_keys(text, &columns)?;
        rows.sort_by(|a, b| compare_rows(a, b, &keys));
    }

    Ok(Cursor::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnType, Value};
    use crate::error::ShimError;

    fn table() -> SnapshotTable {
        SnapshotTable {
            columns: vec![
                ColumnDef::new("TABLE_NAME", ColumnType::Text, false),
                ColumnDef::new("COLUMN_NAME", ColumnType::Text, false),
                ColumnDef::new("ORDINAL_POSITION", ColumnType::Int, false),
            ],
            rows: vec![
                vec!["Foo".into(), "Zed".into(), 1.into()],
                vec!["Bar".into(), "Id".into(), 1.into()],
                vec!["foo".into(), "Alpha".into(), 2.into()],
                vec!["Foo".into(), "Mid".into(), 3.into()],
            ],
        }
    }

    fn names(cursor: Cursor) -> Vec<String> {
        cursor
            .map(|row| row[1].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_no_clauses_returns_snapshot_unchanged() {
        let cursor = apply(table(), None, Some("  ")).unwrap();
        assert_eq!(cursor.remaining(), 4);
        assert_eq!(names(cursor), ["Zed", "Id", "Alpha", "Mid"]);
    }

    #[test]
    fn test_filter_keeps_original_order() {
        let cursor = apply(table(), Some("`TABLE_NAME`='Foo'"), None).unwrap();
        assert_eq!(cursor.columns().len(), 3);
        assert_eq!(names(cursor), ["Zed", "Alpha", "Mid"]);
    }

    #[test]
    fn test_filter_then_sort() {
        let cursor = apply(
            table(),
            Some("`TABLE_NAME`='Foo'"),
            Some("`COLUMN_NAME`"),
        )
        .unwrap();
        assert_eq!(names(cursor), ["Alpha", "Mid", "Zed"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let cursor = apply(table(), None, Some("ORDINAL_POSITION")).unwrap();
        assert_eq!(names(cursor), ["Zed", "Id", "Alpha", "Mid"]);

        let cursor = apply(table(), None, Some("ORDINAL_POSITION DESC")).unwrap();
        assert_eq!(names(cursor), ["Mid", "Alpha", "Zed", "Id"]);
    }

    #[test]
    fn test_empty_result_keeps_schema() {
        let cursor = apply(table(), Some("TABLE_NAME = 'None'"), None).unwrap();
        assert_eq!(cursor.column_index("column_name"), Some(1));
        assert_eq!(cursor.into_rows(), Vec::<Row>::new());
    }

    #[test]
    fn test_errors_are_filter_errors() {
        let err = apply(table(), Some("ORDINAL_POSITION"), None).unwrap_err();
        assert!(matches!(err, ShimError::Filter { .. }));
        assert!(err.is_usage_error());

        let err = apply(table(), None, Some("NOPE")).unwrap_err();
        assert!(matches!(err, ShimError::Filter { .. }));
    }

    #[test]
    fn test_cursor_is_forward_only() {
        let mut cursor = apply(table(), Some("ORDINAL_POSITION > 1"), None).unwrap();
        assert_eq!(cursor.len(), 2);
        assert_eq!(cursor.next().map(|r| r[2].clone()), Some(Value::Int(2)));
        assert_eq!(cursor.remaining(), 1);
    }
}
