//! Identifier and literal quoting rules of the desktop engine.
//!
//! Object names reach the interceptor in three spellings: bare, wrapped in
//! backticks, or wrapped in square brackets. Names handed to the schema
//! provider are validated against the engine's naming rules first, so a
//! rename can never smuggle a second statement or an illegal name through.

use crate::error::{Result, ShimError};

/// Maximum object name length accepted by the engine, in characters.
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Characters the engine rejects inside object names.
const FORBIDDEN_CHARS: &[char] = &['.', '!', '`', '[', ']'];

/// Validate an object name before it is passed to the schema provider.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing control characters (including NUL)
/// - Identifiers with a leading space
/// - Identifiers containing `.`, `!`, `` ` ``, `[` or `]`
/// - Identifiers exceeding 64 characters
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ShimError::Identifier(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.chars().any(char::is_control) {
        return Err(ShimError::Identifier(format!(
            "Identifier contains a control character: {:?}",
            name
        )));
    }

    if name.starts_with(' ') {
        return Err(ShimError::Identifier(format!(
            "Identifier cannot start with a space: {:?}",
            name
        )));
    }

    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(ShimError::Identifier(format!(
            "Identifier contains forbidden character '{}': {:?}",
            c, name
        )));
    }

    let len = name.chars().count();
    if len > MAX_IDENTIFIER_LENGTH {
        return Err(ShimError::Identifier(format!(
            "Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, len, name
        )));
    }

    Ok(())
}

/// Quote an identifier using brackets.
///
/// Validates the identifier before quoting.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_identifier("Order Details")?, "[Order Details]");
/// ```
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name))
}

/// Escape a literal for embedding between `quote` characters by doubling them.
pub fn escape_quoted(value: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    value.replace(quote, &doubled)
}

/// Undo [`escape_quoted`]: every doubled `quote` becomes a single one.
pub fn unescape_quoted(value: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    value.replace(&doubled, &quote.to_string())
}
