//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// These are configuration errors: they are raised while a rule tree is
/// validated or compiled against a schema, before any request is served.
/// Authorization denials are not errors; they are ordinary [`Verdict`]
/// outcomes.
///
/// [`Verdict`]: crate::types::Verdict
#[derive(Debug, Error)]
pub enum WardenError {
    /// Two structurally different rules were registered under the same name
    #[error("Multiple definitions for rules: {0}")]
    DuplicateRuleNames(String),

    /// The rule tree targets types the schema does not declare
    #[error("Rules applied to unknown types: {0}")]
    UnknownTypes(String),

    /// The rule tree targets fields the schema does not declare
    #[error("Rules applied to unknown fields: {0}")]
    UnknownFields(String),

    /// One tree declares both a schema-wide rule and per-type rules
    #[error("Cannot combine a schema-wide rule with per-type rules")]
    MixedTreeShape,
}

/// Result type for authorization engine operations
pub type Result<T> = std::result::Result<T, WardenError>;
