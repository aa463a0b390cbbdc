//! Error types for the derivation engine.
//!
//! Slot and store errors never abort a request: the orchestrator logs them
//! and carries on without that attribute (or without policy data).

use thiserror::Error;

use pwdshadow_core::{AttributeId, ConvertError, CoreError, ModOp, ValueKind};
use pwdshadow_settings::SettingsError;

/// Errors raised while loading a value into an attribute slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The slot is already bound to another attribute.
    #[error("slot bound to {bound} cannot hold {requested}")]
    IdentityMismatch {
        /// Attribute the slot is bound to.
        bound: AttributeId,
        /// Attribute that was offered.
        requested: AttributeId,
    },

    /// The slot already holds values of another kind.
    #[error("slot for {attribute} holds {bound} values, not {requested}")]
    KindMismatch {
        /// Attribute the slot is bound to.
        attribute: AttributeId,
        /// Kind fixed by the first write.
        bound: ValueKind,
        /// Kind that was requested.
        requested: ValueKind,
    },

    /// The raw value could not be converted.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// The attribute is not in the identity table.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An add carried no value to convert.
    #[error("{attribute} modification carries no value")]
    MissingValue {
        /// Target attribute.
        attribute: AttributeId,
    },

    /// The modification type has no add/delete meaning.
    #[error("unsupported {op:?} modification of {attribute}")]
    UnsupportedOperation {
        /// Offending operation.
        op: ModOp,
        /// Target attribute.
        attribute: AttributeId,
    },
}

/// Errors raised by an [`EntryStore`](crate::policy::EntryStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("entry store unavailable: {0}")]
    Unavailable(String),

    /// No entry exists at the DN.
    #[error("no entry at {0}")]
    NotFound(String),
}

/// Errors raised while building an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Settings failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A tracked attribute is missing from the identity table.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for engine construction.
pub type Result<T> = std::result::Result<T, EngineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
