//! Error types for the interception engine.

use thiserror::Error;

/// Boxed error type used to carry driver and provider failures unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for intercepted command execution.
#[derive(Error, Debug)]
pub enum ShimError {
    /// Configuration error (invalid YAML, bad data directory, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text looks like a database lifecycle command but no pattern could parse it
    #[error("Unrecognized database command: {command}")]
    UnrecognizedCommand { command: String },

    /// A pattern matched but a required capture was blank
    #[error("Missing required {field} in command: {command}")]
    MissingField {
        field: &'static str,
        command: String,
    },

    /// Filter or order clause could not be parsed or evaluated
    #[error("Invalid filter expression '{expression}': {message}")]
    Filter { expression: String, message: String },

    /// Identifier failed validation before reaching the schema provider
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// Schema provider failure, propagated unchanged
    #[error("Schema provider error ({context}): {source}")]
    Provider {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Underlying driver failure, propagated unchanged
    #[error("Driver error ({context}): {source}")]
    Driver {
        context: String,
        #[source]
        source: BoxError,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl ShimError {
    /// Create an UnrecognizedCommand error for the given command text.
    pub fn unrecognized(command: impl Into<String>) -> Self {
        ShimError::UnrecognizedCommand {
            command: command.into(),
        }
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &'static str, command: impl Into<String>) -> Self {
        ShimError::MissingField {
            field,
            command: command.into(),
        }
    }

    /// Create a Filter error.
    pub fn filter(expression: impl Into<String>, message: impl Into<String>) -> Self {
        ShimError::Filter {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Wrap a schema provider failure.
    pub fn provider(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ShimError::Provider {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wrap a driver failure.
    pub fn driver(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ShimError::Driver {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether the error was raised by this layer for recognized but unusable input.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ShimError::UnrecognizedCommand { .. }
                | ShimError::MissingField { .. }
                | ShimError::Filter { .. }
                | ShimError::Identifier(_)
        )
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShimError::Config(_) | ShimError::Yaml(_) => 2,
            ShimError::UnrecognizedCommand { .. }
            | ShimError::MissingField { .. }
            | ShimError::Filter { .. }
            | ShimError::Identifier(_) => 3,
            ShimError::Provider { .. } | ShimError::Driver { .. } => 4,
            ShimError::Io(_) | ShimError::Json(_) => 5,
            ShimError::Cancelled => 130,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for interception operations.
pub type Result<T> = std::result::Result<T, ShimError>;
