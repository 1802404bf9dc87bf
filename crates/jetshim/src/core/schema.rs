//! Catalog metadata records returned by a schema provider.
//!
//! Each record type corresponds to one catalog object. The snapshot builder
//! shapes them into the fixed column layout of that object, so providers never
//! deal with column ordering or naming.

use serde::{Deserialize, Serialize};

/// Kind of table reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    /// Ordinary user table.
    BaseTable,
    /// Saved select query.
    View,
    /// Engine-internal table (MSys*).
    SystemTable,
    /// Table linked from another database file.
    LinkedTable,
}

impl TableType {
    pub fn as_str(self) -> &'static str {
        match self {
            TableType::BaseTable => "BASE TABLE",
            TableType::View => "VIEW",
            TableType::SystemTable => "SYSTEM TABLE",
            TableType::LinkedTable => "LINKED TABLE",
        }
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Table kind.
    pub table_type: TableType,
    /// Table-level validation rule, if any.
    pub validation_rule: Option<String>,
    /// Message shown when the validation rule fails.
    pub validation_text: Option<String>,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Owning table.
    pub table_name: String,
    /// Schema name; the engine has a single unnamed schema.
    pub table_schema: Option<String>,
    /// Column name.
    pub name: String,
    /// 1-based position in the table.
    pub ordinal_position: i32,
    /// Engine type name (e.g., "integer", "varchar").
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Maximum length for character/binary types.
    pub max_length: Option<i64>,
    /// Numeric precision.
    pub precision: Option<i32>,
    /// Numeric scale.
    pub scale: Option<i32>,
    /// Default value expression.
    pub default: Option<String>,
    /// Seed of a counter (identity) column.
    pub identity_seed: Option<i64>,
    /// Increment of a counter (identity) column.
    pub identity_increment: Option<i64>,
}

/// Index kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    PrimaryKey,
    Unique,
    Index,
}

impl IndexType {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexType::PrimaryKey => "PRIMARY",
            IndexType::Unique => "UNIQUE",
            IndexType::Index => "INDEX",
        }
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub table_name: String,
    pub name: String,
    pub index_type: IndexType,
    /// Whether indexed columns may contain NULL.
    pub is_nullable: bool,
    /// Whether NULL keys are left out of the index.
    pub ignores_nulls: bool,
}

/// One column participating in an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumnInfo {
    pub table_name: String,
    pub index_name: String,
    /// 1-based position in the index key.
    pub ordinal_position: i32,
    pub column_name: String,
    pub is_descending: bool,
}

/// Referential action on delete/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
}

impl ReferentialAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
        }
    }
}

/// Relation (foreign key) metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub name: String,
    /// Table holding the foreign key columns.
    pub referencing_table: String,
    /// Table holding the referenced key.
    pub principal_table: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    pub is_enforced: bool,
    pub is_inherited: bool,
}

/// Column pair within a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationColumnInfo {
    pub relation_name: String,
    pub referencing_column: String,
    pub principal_column: String,
    /// 1-based position in the relation key.
    pub ordinal_position: i32,
}

/// Check constraint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraintInfo {
    pub table_name: String,
    pub name: String,
    /// Constraint expression.
    pub check_clause: String,
}
