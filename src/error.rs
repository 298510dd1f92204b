//! The [`RaError`] `enum` definition and error messages.
//!
use thiserror::Error;

/// The [`RaError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum RaError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),

    // Stanza parsing related errors
    #[error("Stanza name line has no value: '{0}'")]
    MissingNameValue(String),
    #[error("Stanza contains no lines")]
    EmptyStanza,
    #[error("Stanza lines disagree on leading indentation")]
    InconsistentIndent,
    #[error("Stanza at nesting depth {found} skips a level ({max} enclosing scopes open)")]
    SkippedDepth { found: usize, max: usize },
    #[error("Stanzas must share the name field '{expected}', but found '{found}'")]
    InconsistentNameField { expected: String, found: String },
    #[error("Duplicate key '{0}'")]
    DuplicateKey(String),
    #[error("Duplicate stanza name '{0}'")]
    DuplicateName(String),

    // Alternate index errors
    #[error("Stanza '{0}' is missing field '{1}'")]
    MissingField(String, String),
    #[error("Alternate field '{field}' value '{value}' is shared by stanzas '{first}' and '{second}'")]
    NonUniqueKey {
        field: String,
        value: String,
        first: String,
        second: String,
    },

    // Settings file errors
    #[error("Settings file must have '{0}' defined")]
    MissingSetting(String),

    // Command line tool related errors
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
