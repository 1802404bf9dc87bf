//! Connection-string and file-name resolution.
//!
//! Lifecycle commands name their target either by file name or by a full
//! connection string. This module decides which one it was given, pulls the
//! data source out of connection strings, and turns file names into absolute
//! paths:
//!
//! ```text
//! Provider=Microsoft.ACE.OLEDB.12.0;Data Source='Joe''s.accdb'  ->  Joe's.accdb
//! |DataDirectory|\Sales                                          ->  <data dir>/Sales
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::DATA_DIRECTORY_PLACEHOLDER;
use crate::core::identifier::escape_quoted;
use crate::error::{Result, ShimError};

const DATA_SOURCE_KEYS: &[&str] = &["data source", "dbq"];
const PASSWORD_KEYS: &[&str] = &["jet oledb:database password", "pwd"];
const PROVIDER_KEYS: &[&str] = &["provider", "driver"];

/// One `key=value` segment. Keys are lowercased with whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEntry {
    pub key: String,
    pub value: String,
    /// Quote character the value was wrapped in, if any.
    pub quote: Option<char>,
}

/// Parsed view of a connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    pub entries: Vec<ConnectionEntry>,
}

impl ConnectionDescriptor {
    /// Parse `key=value;...` text. Segments without `=` are ignored.
    ///
    /// Values may be wrapped in single or double quotes; inside, a doubled
    /// quote stands for one literal quote and `;` loses its meaning.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut chars = text.chars().peekable();

        loop {
            let mut key = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' || c == ';' {
                    break;
                }
                key.push(c);
                chars.next();
            }

            match chars.next() {
                None => break,
                Some(';') => continue,
                Some(_) => {}
            }

            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }

            let mut value = String::new();
            let mut quote = None;
            match chars.peek().copied() {
                Some(q @ ('\'' | '"')) => {
                    chars.next();
                    quote = Some(q);
                    while let Some(c) = chars.next() {
                        if c != q {
                            value.push(c);
                        } else if chars.peek() == Some(&q) {
                            value.push(q);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    // Anything between the closing quote and ';' is dropped
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                    }
                }
                _ => {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                        value.push(c);
                    }
                    value = value.trim().to_string();
                }
            }

            let key = normalize_key(&key);
            if !key.is_empty() {
                entries.push(ConnectionEntry { key, value, quote });
            }
        }

        Self { entries }
    }

    /// Value of the first entry whose key is one of `keys`.
    fn find(&self, keys: &[&str]) -> Option<&ConnectionEntry> {
        self.entries
            .iter()
            .find(|entry| keys.contains(&entry.key.as_str()))
    }

    /// Case-insensitive lookup of a single key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.find(&[key.as_str()]).map(|e| e.value.as_str())
    }

    pub fn has_provider(&self) -> bool {
        self.find(PROVIDER_KEYS).is_some()
    }

    pub fn has_data_source(&self) -> bool {
        self.find(DATA_SOURCE_KEYS).is_some()
    }

    /// Unquoted data source value.
    pub fn data_source(&self) -> Option<&str> {
        self.find(DATA_SOURCE_KEYS).map(|e| e.value.as_str())
    }

    /// Quote character used around the data source, if it was quoted.
    pub fn data_source_quote(&self) -> Option<char> {
        self.find(DATA_SOURCE_KEYS).and_then(|e| e.quote)
    }

    /// Database password, blank treated as absent.
    pub fn password(&self) -> Option<&str> {
        self.find(PASSWORD_KEYS)
            .map(|e| e.value.as_str())
            .filter(|v| !v.is_empty())
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn connection_string_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|;)\s*(?:provider|driver|data\s+source|dbq)\s*=")
            .expect("valid connection string regex")
    })
}

fn provider_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|;)\s*(?:provider|driver)\s*=").expect("valid provider regex")
    })
}

/// Whether the text has the `key=value;...` shape for a recognized key.
pub fn is_connection_string(text: &str) -> bool {
    connection_string_regex().is_match(text)
}

/// Whether the text carries a `provider=` or `driver=` segment.
pub fn has_provider_token(text: &str) -> bool {
    provider_regex().is_match(text)
}

/// The unquoted `Data Source` / `DBQ` value, if the text has one.
pub fn extract_data_source(text: &str) -> Option<String> {
    ConnectionDescriptor::parse(text)
        .data_source()
        .map(str::to_string)
}

/// The data source of a connection string, or the trimmed input itself.
pub fn resolve_data_source(text: &str) -> String {
    extract_data_source(text).unwrap_or_else(|| text.trim().to_string())
}

/// Database password carried by a connection string.
pub fn extract_password(text: &str) -> Option<String> {
    ConnectionDescriptor::parse(text)
        .password()
        .map(str::to_string)
}

fn strip_placeholder(text: &str) -> Option<&str> {
    let prefix = text.get(..DATA_DIRECTORY_PLACEHOLDER.len())?;
    prefix
        .eq_ignore_ascii_case(DATA_DIRECTORY_PLACEHOLDER)
        .then(|| &text[DATA_DIRECTORY_PLACEHOLDER.len()..])
}

fn is_invalid_path_char(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '|' | '?' | '*') || c.is_control()
}

/// Whether the text is a usable file name rather than a connection string.
pub fn is_plain_file_name(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_connection_string(trimmed) {
        return false;
    }
    let rest = strip_placeholder(trimmed).unwrap_or(trimmed);
    !rest.chars().any(is_invalid_path_char)
}

/// Expand the `|DataDirectory|` prefix and make the path absolute.
pub fn expand_file_name(text: &str, data_directory: &Path) -> Result<PathBuf> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ShimError::missing_field("file name", text));
    }

    let path = match strip_placeholder(trimmed) {
        Some(rest) => data_directory.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(trimmed),
    };

    Ok(std::path::absolute(path)?)
}

/// Append `extension` only when the path has none.
pub fn ensure_default_extension(path: &Path, extension: &str) -> PathBuf {
    match path.extension() {
        Some(ext) if !ext.is_empty() => path.to_path_buf(),
        _ => path.with_extension(extension),
    }
}

/// Escape a value for use inside a single-quoted literal.
pub fn escape_single_quoted(value: &str) -> String {
    escape_quoted(value, '\'')
}
