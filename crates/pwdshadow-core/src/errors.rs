//! Error types for attribute lookup and value conversion.

use thiserror::Error;

use crate::attributes::Syntax;
use crate::convert::ValueKind;

/// Errors raised by the attribute registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The attribute name is not in the identity table.
    #[error("unknown attribute type: {0}")]
    UnknownAttribute(String),

    /// The identity table was already built; it is immutable afterwards.
    #[error("attribute registry is already initialized")]
    RegistryInitialized,
}

/// Errors raised while converting a raw attribute value.
///
/// Both variants are per-attribute: callers log them and drop that
/// attribute's contribution instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// The attribute's declared syntax cannot hold values of this kind.
    #[error("attribute {attribute} has {actual} syntax, {kind} values require {expected}")]
    Syntax {
        /// Attribute name.
        attribute: String,
        /// Requested value kind.
        kind: ValueKind,
        /// Syntax the kind requires.
        expected: &'static str,
        /// Syntax the attribute is declared with.
        actual: Syntax,
    },

    /// The raw value is malformed for the requested kind.
    #[error("malformed {kind} value for {attribute}: {value:?}")]
    Parse {
        /// Attribute name.
        attribute: String,
        /// Requested value kind.
        kind: ValueKind,
        /// The offending raw value.
        value: String,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
