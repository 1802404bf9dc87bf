//! Obsolete lifecycle syntax, still accepted for existing migration scripts.
//!
//! Older scripts pass either a bare file name or a full connection string:
//!
//! ```text
//! CREATE DATABASE Northwind.accdb
//! DROP DATABASE provider=Microsoft.ACE.OLEDB.12.0;Data Source=Northwind.accdb
//! ```
//!
//! Both are normalized to the same [`LifecycleRequest`] the quoted syntax
//! produces. These patterns run only after the current syntax has failed.

use regex::Captures;

use super::{Intercepted, LifecycleRequest, Pattern, PatternKind, STATEMENT_END};
use crate::connection;
use crate::error::{Result, ShimError};

fn create_from_connection_string(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    let conn = caps.name("conn").map(|m| m.as_str()).unwrap_or_default();
    let file_name = connection::extract_data_source(conn)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ShimError::missing_field("data source", text.trim()))?;

    Ok(Some(Intercepted::Lifecycle(LifecycleRequest::Create {
        file_name,
        password: connection::extract_password(conn),
    })))
}

fn drop_from_connection_string(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    let conn = caps.name("conn").map(|m| m.as_str()).unwrap_or_default();
    let target = connection::extract_data_source(conn)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ShimError::missing_field("data source", text.trim()))?;

    Ok(Some(Intercepted::Lifecycle(LifecycleRequest::Drop { target })))
}

/// Catch-all: whatever follows the keyword is a file name or connection string.
fn database_command(caps: &Captures<'_>, text: &str) -> Result<Option<Intercepted>> {
    let raw = caps.name("file").map(|m| m.as_str().trim()).unwrap_or_default();
    if raw.is_empty() {
        return Err(ShimError::missing_field("file name", text.trim()));
    }

    let is_create = caps
        .name("verb")
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("CREATE"));

    let request = if connection::is_connection_string(raw) {
        let file_name = connection::extract_data_source(raw)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ShimError::missing_field("data source", text.trim()))?;
        if is_create {
            LifecycleRequest::Create {
                file_name,
                password: connection::extract_password(raw),
            }
        } else {
            LifecycleRequest::Drop { target: file_name }
        }
    } else if is_create {
        LifecycleRequest::Create {
            file_name: raw.to_string(),
            password: None,
        }
    } else {
        LifecycleRequest::Drop {
            target: raw.to_string(),
        }
    };

    Ok(Some(Intercepted::Lifecycle(request)))
}

/// Legacy patterns in priority order: specific connection-string forms first.
pub(crate) fn patterns() -> Vec<Pattern> {
    vec![
        Pattern::new(
            PatternKind::LegacyCreateConnectionString,
            &format!(
                r"^\s*CREATE\s+DATABASE\s+(?P<conn>provider\s*=.*?){}",
                STATEMENT_END
            ),
            create_from_connection_string,
        ),
        Pattern::new(
            PatternKind::LegacyDropConnectionString,
            &format!(
                r"^\s*DROP\s+DATABASE\s+(?P<conn>provider\s*=.*?){}",
                STATEMENT_END
            ),
            drop_from_connection_string,
        ),
        Pattern::new(
            PatternKind::LegacyDatabaseCommand,
            &format!(
                r"^\s*(?P<verb>CREATE|DROP)\s+DATABASE\s+(?P<file>.*?){}",
                STATEMENT_END
            ),
            database_command,
        ),
    ]
}
