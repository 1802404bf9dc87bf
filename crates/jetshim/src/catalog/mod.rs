//! Emulated `INFORMATION_SCHEMA` objects.
//!
//! The engine has no catalog views, so each object here is materialized from
//! schema provider reads into a [`SnapshotTable`] with a fixed column layout.

pub(crate) mod snapshot;

pub use snapshot::build_snapshot;

use serde::Serialize;

use crate::core::{ColumnDef, ColumnType, Row};

/// The closed set of catalog objects that can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogObject {
    Tables,
    Columns,
    Indexes,
    IndexColumns,
    Relations,
    RelationColumns,
    CheckConstraints,
}

impl CatalogObject {
    pub const ALL: [CatalogObject; 7] = [
        CatalogObject::Tables,
        CatalogObject::Columns,
        CatalogObject::Indexes,
        CatalogObject::IndexColumns,
        CatalogObject::Relations,
        CatalogObject::RelationColumns,
        CatalogObject::CheckConstraints,
    ];

    /// Look up an object by its `INFORMATION_SCHEMA` name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|object| object.name().eq_ignore_ascii_case(name))
    }

    /// Name as it appears after `INFORMATION_SCHEMA.`.
    pub fn name(self) -> &'static str {
        match self {
            CatalogObject::Tables => "TABLES",
            CatalogObject::Columns => "COLUMNS",
            CatalogObject::Indexes => "INDEXES",
            CatalogObject::IndexColumns => "INDEX_COLUMNS",
            CatalogObject::Relations => "RELATIONS",
            CatalogObject::RelationColumns => "RELATION_COLUMNS",
            CatalogObject::CheckConstraints => "CHECK_CONSTRAINTS",
        }
    }

    /// Fixed column layout of the object's snapshot.
    pub fn columns(self) -> Vec<ColumnDef> {
        use ColumnType::{Bool, Int, Text};

        let layout: &[(&str, ColumnType, bool)] = match self {
            CatalogObject::Tables => &[
                ("TABLE_NAME", Text, false),
                ("TABLE_TYPE", Text, false),
                ("VALIDATION_RULE", Text, true),
                ("VALIDATION_TEXT", Text, true),
            ],
            CatalogObject::Columns => &[
                ("TABLE_NAME", Text, false),
                ("TABLE_SCHEMA", Text, true),
                ("COLUMN_NAME", Text, false),
                ("ORDINAL_POSITION", Int, false),
                ("DATA_TYPE", Text, false),
                ("IS_NULLABLE", Bool, false),
                ("CHARACTER_MAXIMUM_LENGTH", Int, true),
                ("NUMERIC_PRECISION", Int, true),
                ("NUMERIC_SCALE", Int, true),
                ("COLUMN_DEFAULT", Text, true),
                ("IDENTITY_SEED", Int, true),
                ("IDENTITY_INCREMENT", Int, true),
            ],
            CatalogObject::Indexes => &[
                ("TABLE_NAME", Text, false),
                ("INDEX_NAME", Text, false),
                ("INDEX_TYPE", Text, false),
                ("IS_NULLABLE", Bool, false),
                ("IGNORES_NULLS", Bool, false),
            ],
            CatalogObject::IndexColumns => &[
                ("TABLE_NAME", Text, false),
                ("INDEX_NAME", Text, false),
                ("ORDINAL_POSITION", Int, false),
                ("COLUMN_NAME", Text, false),
                ("IS_DESCENDING", Bool, false),
            ],
            CatalogObject::Relations => &[
                ("RELATION_NAME", Text, false),
                ("REFERENCING_TABLE_NAME", Text, false),
                ("PRINCIPAL_TABLE_NAME", Text, false),
                ("ON_DELETE", Text, false),
                ("ON_UPDATE", Text, false),
                ("IS_ENFORCED", Bool, false),
                ("IS_INHERITED", Bool, false),
            ],
            CatalogObject::RelationColumns => &[
                ("RELATION_NAME", Text, false),
                ("REFERENCING_COLUMN_NAME", Text, false),
                ("PRINCIPAL_COLUMN_NAME", Text, false),
                ("ORDINAL_POSITION", Int, false),
            ],
            CatalogObject::CheckConstraints => &[
                ("TABLE_NAME", Text, false),
                ("CONSTRAINT_NAME", Text, false),
                ("CHECK_CLAUSE", Text, false),
            ],
        };

        layout.iter()
            .map(|(name, data_type, nullable)| ColumnDef::new(*name, *data_type, *nullable))
            .collect()
    }
}

impl std::fmt::Display for CatalogObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Materialized catalog object: typed columns plus rows in provider order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotTable {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Row>,
}

impl SnapshotTable {
    /// Empty snapshot with the object's column layout.
    pub fn empty(object: CatalogObject) -> Self {
        Self {
            columns: object.columns(),
            rows: Vec::new(),
        }
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
