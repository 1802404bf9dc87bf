//! Recognition of the pseudo-SQL statements the engine emulates.
//!
//! Patterns are evaluated in a fixed priority order and the first match wins:
//!
//! 1. Catalog queries and renames (current syntax only)
//! 2. Quoted `CREATE DATABASE` / `DROP DATABASE` (current syntax)
//! 3. Legacy lifecycle syntax, see [`legacy`]
//!
//! Lifecycle patterns sit behind a gate. Text that passes the gate but fails
//! every lifecycle pattern is an error, never a passthrough: forwarding it
//! would only produce a confusing native error.
//!
//! Classification is pure. It extracts and unescapes captures, nothing more.

pub mod legacy;

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::catalog::CatalogObject;
use crate::core::identifier::unescape_quoted;
use crate::error::{Result, ShimError};

/// Trailing part shared by every statement pattern: optional `;` and whitespace.
pub(crate) const STATEMENT_END: &str = r"\s*;?\s*$";

/// Which pattern recognized a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// ``SELECT * FROM `INFORMATION_SCHEMA.<object>` ...``
    CatalogQuery,
    /// `ALTER TABLE t RENAME COLUMN a TO b`
    RenameColumn,
    /// `ALTER TABLE a RENAME TO b`
    RenameTable,
    /// `CREATE DATABASE 'file' [PASSWORD 'pwd']`
    CreateDatabase,
    /// `DROP DATABASE 'file'`
    DropDatabase,
    /// `CREATE DATABASE provider=...`
    LegacyCreateConnectionString,
    /// `DROP DATABASE provider=...`
    LegacyDropConnectionString,
    /// `CREATE|DROP DATABASE <anything>`
    LegacyDatabaseCommand,
}

impl PatternKind {
    /// Whether the pattern belongs to the obsolete syntax family.
    pub fn is_legacy(self) -> bool {
        matches!(
            self,
            PatternKind::LegacyCreateConnectionString
                | PatternKind::LegacyDropConnectionString
                | PatternKind::LegacyDatabaseCommand
        )
    }

    /// Whether the pattern creates or destroys a whole database.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            PatternKind::CreateDatabase | PatternKind::DropDatabase
        ) || self.is_legacy()
    }
}

/// A catalog query with its optional clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogQuery {
    pub object: CatalogObject,
    /// Text after `WHERE`, if present.
    pub filter: Option<String>,
    /// Text after `ORDER BY`, if present.
    pub order: Option<String>,
}

/// A request to create or destroy a database file.
///
/// Required fields are always non-blank; blank captures are rejected during
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum LifecycleRequest {
    Create {
        file_name: String,
        password: Option<String>,
    },
    Drop {
        /// File name or connection string naming the database.
        target: String,
    },
}

/// Typed result of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intercepted {
    Catalog(CatalogQuery),
    Lifecycle(LifecycleRequest),
    RenameTable {
        old_name: String,
        new_name: String,
    },
    RenameColumn {
        table_name: String,
        old_name: String,
        new_name: String,
    },
}

/// A recognized command: which pattern matched and what it extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classified {
    pub kind: PatternKind,
    pub request: Intercepted,
}

type Extractor = fn(&Captures<'_>, &str) -> Result<Option<Intercepted>>;

/// One entry of a pattern table.
pub(crate) struct Pattern {
    kind: PatternKind,
    regex: Regex,
    extract: Extractor,
}

impl Pattern {
    pub(crate) fn new(kind: PatternKind, source: &str, extract: Extractor) -> Self {
        let regex = Regex::new(&format!("(?is){}", source))
            .unwrap_or_else(|e| panic!("invalid {:?} pattern: {}", kind, e));
        Self {
            kind,
            regex,
            extract,
        }
    }

    /// Match and extract. `Ok(None)` means "not this pattern".
    fn apply(&self, text: &str) -> Result<Option<Classified>> {
        let Some(caps) = self.regex.captures(text) else {
            return Ok(None);
        };
        Ok((self.extract)(&caps, text)?.map(|request| Classified {
            kind: self.kind,
            request,
        }))
    }
}

/// Regex fragment for an identifier that may be bare, backticked or bracketed.
///
/// Produces three named groups; read them back with [`identifier`].
pub(crate) fn ident(name: &str) -> String {
    format!(
        r"(?:`(?P<{n}_bt>[^`]*)`|\[(?P<{n}_br>[^\]]*)\]|(?P<{n}>[^\s`\[\];]+))",
        n = name
    )
}

/// Read an identifier captured by [`ident`].
///
/// The quoted groups hold only the interior, which is returned as written.
pub(crate) fn identifier<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(&format!("{name}_bt"))
        .or_else(|| caps.name(&format!("{name}_br")))
        .or_else(|| caps.name(name))
        .map(|m| m.as_str())
}

fn required_identifier(
    caps: &Captures<'_>,
    name: &str,
    field: &'static str,
    text: &str,
) -> Result<String> {
    match identifier(caps, name) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(ShimError::missing_field(field, text.trim())),
    }
}

/// Unescape a single-quoted capture; blank becomes `None`.
pub(crate) fn quoted_capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| unescape_quoted(m.as_str(), '\''))
        .filter(|v| !v.trim().is_empty())
}

/// Optional clause capture, trimmed; blank becomes `None`.
fn clause(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract_catalog(caps: &Captures<'_>, _text: &str) -> Result<Option<Intercepted>> {
    let name = caps
        .name("obj_bt")
        .or_else(|| caps.name("obj_br"))
        .or_else(|| caps.name("obj"))
        .map(|m| m.as_str())
        .unwrap_or_default();

    // Unknown objects are left to the driver
    let Some(object) = CatalogObject::from_name(name) else {
        debug!("INFORMATION_SCHEMA.{} is not an emulated catalog object", name);
        return Ok(None);
    };

    Ok(Some(Intercepted::Catalog(CatalogQuery {
        object,
        filter: clause(caps, "filter"),
        order: clause(caps, "order"),
    })))
}

fn extract_rename_column(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    Ok(Some(Intercepted::RenameColumn {
        table_name: required_identifier(caps, "table", "table name", text)?,
        old_name: required_identifier(caps, "old", "column name", text)?,
        new_name: required_identifier(caps, "new", "new column name", text)?,
    }))
}

fn extract_rename_table(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    Ok(Some(Intercepted::RenameTable {
        old_name: required_identifier(caps, "table", "table name", text)?,
        new_name: required_identifier(caps, "new", "new table name", text)?,
    }))
}

fn extract_create(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    let file_name =
        quoted_capture(caps, "file").ok_or_else(|| ShimError::missing_field("file name", text.trim()))?;
    Ok(Some(Intercepted::Lifecycle(LifecycleRequest::Create {
        file_name,
        password: quoted_capture(caps, "password"),
    })))
}

fn extract_drop(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    let target =
        quoted_capture(caps, "file").ok_or_else(|| ShimError::missing_field("file name", text.trim()))?;
    Ok(Some(Intercepted::Lifecycle(LifecycleRequest::Drop { target })))
}

/// Catalog and rename patterns, in priority order.
fn statement_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new(
                PatternKind::CatalogQuery,
                &format!(
                    r"^\s*SELECT\s+\*\s+FROM\s+(?:`INFORMATION_SCHEMA\.(?P<obj_bt>[^`]+)`|\[INFORMATION_SCHEMA\.(?P<obj_br>[^\]]+)\]|INFORMATION_SCHEMA\.(?P<obj>\w+))(?:\s+WHERE\s+(?P<filter>.+?))?(?:\s+ORDER\s+BY\s+(?P<order>.+?))?{}",
                    STATEMENT_END
                ),
                extract_catalog,
            ),
            Pattern::new(
                PatternKind::RenameColumn,
                &format!(
                    r"^\s*ALTER\s+TABLE\s+{}\s+RENAME\s+COLUMN\s+{}\s+TO\s+{}{}",
                    ident("table"),
                    ident("old"),
                    ident("new"),
                    STATEMENT_END
                ),
                extract_rename_column,
            ),
            Pattern::new(
                PatternKind::RenameTable,
                &format!(
                    r"^\s*ALTER\s+TABLE\s+{}\s+RENAME\s+TO\s+{}{}",
                    ident("table"),
                    ident("new"),
                    STATEMENT_END
                ),
                extract_rename_table,
            ),
        ]
    })
}

/// Lifecycle patterns behind the gate: current syntax, then legacy.
fn lifecycle_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let mut patterns = vec![
            Pattern::new(
                PatternKind::CreateDatabase,
                &format!(
                    r"^\s*CREATE\s+DATABASE\s+'(?P<file>(?:[^']|'')*)'(?:\s+PASSWORD\s+'(?P<password>(?:[^']|'')*)')?{}",
                    STATEMENT_END
                ),
                extract_create,
            ),
            Pattern::new(
                PatternKind::DropDatabase,
                &format!(
                    r"^\s*DROP\s+DATABASE\s+'(?P<file>(?:[^']|'')*)'{}",
                    STATEMENT_END
                ),
                extract_drop,
            ),
        ];
        patterns.extend(legacy::patterns());
        patterns
    })
}

fn database_gate() -> &'static Regex {
    static GATE: OnceLock<Regex> = OnceLock::new();
    GATE.get_or_init(|| {
        Regex::new(r"(?is)^\s*(?:CREATE|DROP)\s+DATABASE\b").expect("valid database gate regex")
    })
}

/// Whether the text is a `CREATE DATABASE` / `DROP DATABASE` command of any form.
///
/// True also for malformed commands that [`classify`] will reject.
pub fn is_database_command(text: &str) -> bool {
    database_gate().is_match(text)
}

/// Classify command text.
///
/// Returns `Ok(None)` when the text should be forwarded to the driver
/// unchanged, and an error when it is a database command that cannot be
/// parsed or lacks a required field.
pub fn classify(text: &str) -> Result<Option<Classified>> {
    for pattern in statement_patterns() {
        if let Some(classified) = pattern.apply(text)? {
            debug!("Classified command as {:?}", classified.kind);
            return Ok(Some(classified));
        }
    }

    if !is_database_command(text) {
        return Ok(None);
    }

    for pattern in lifecycle_patterns() {
        if let Some(classified) = pattern.apply(text)? {
            debug!("Classified command as {:?}", classified.kind);
            return Ok(Some(classified));
        }
    }

    Err(ShimError::unrecognized(text.trim()))
}
