//! Per-attribute request state and the loaders that fill it.
//!
//! A [`Slot`] is bound to one attribute identity and one [`ValueKind`]. It
//! records what the stored record held, what the pending request does to
//! the attribute, and what the engine decided.

use serde::Serialize;

use pwdshadow_core::{AttributeId, CoreError, Entry, ModOp, Modification, ValueKind, convert, registry};

use crate::errors::SlotError;

/// Where a record value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The record as stored before this request.
    Stored,
    /// The record being created; its values count as user additions.
    Incoming,
}

/// Last user-modification event for the attribute in this request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pending {
    /// Not touched by the request.
    #[default]
    None,
    /// Added or replaced with a value.
    Add,
    /// Deleted, or replaced with no values.
    Delete,
}

/// Engine decision for a derived attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// Leave the attribute alone.
    #[default]
    Unchanged,
    /// Write `value_after`.
    MustAdd {
        /// The value came from an override attribute.
        overridden: bool,
    },
    /// Remove every value.
    MustDelete,
}

/// Mutable state of one tracked attribute for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    identity: Option<AttributeId>,
    kind: Option<ValueKind>,
    existed_before: bool,
    pending: Pending,
    outcome: Outcome,
    value_before: i64,
    value_incoming: i64,
    value_after: i64,
}

impl Slot {
    /// Unbound, zeroed slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot bound to `identity`.
    pub fn bound(identity: AttributeId) -> Self {
        Self {
            identity: Some(identity),
            ..Self::default()
        }
    }

    /// Bound attribute, if any.
    pub fn identity(&self) -> Option<AttributeId> {
        self.identity
    }

    /// Kind fixed by the first write, if any.
    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    /// The stored record held the attribute.
    pub fn existed_before(&self) -> bool {
        self.existed_before
    }

    /// Last user-modification event.
    pub fn pending(&self) -> Pending {
        self.pending
    }

    /// The request adds (or replaces) the attribute.
    pub fn user_added(&self) -> bool {
        self.pending == Pending::Add
    }

    /// The request deletes the attribute.
    pub fn user_deleted(&self) -> bool {
        self.pending == Pending::Delete
    }

    /// The request touches the attribute at all.
    pub fn user_modified(&self) -> bool {
        self.pending != Pending::None
    }

    /// Engine decision.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// The engine decided to write the attribute.
    pub fn must_add(&self) -> bool {
        matches!(self.outcome, Outcome::MustAdd { .. })
    }

    /// The engine decided to remove the attribute.
    pub fn must_delete(&self) -> bool {
        self.outcome == Outcome::MustDelete
    }

    /// The written value came from an override attribute.
    pub fn overridden(&self) -> bool {
        self.outcome == Outcome::MustAdd { overridden: true }
    }

    /// Value held by the stored record.
    pub fn value_before(&self) -> i64 {
        self.value_before
    }

    /// Value supplied by the request.
    pub fn value_incoming(&self) -> i64 {
        self.value_incoming
    }

    /// Value after the request.
    pub fn value_after(&self) -> i64 {
        self.value_after
    }

    /// Whether the attribute holds a value once the request is applied.
    pub fn will_exist(&self) -> bool {
        if self.must_delete() || self.user_deleted() {
            return false;
        }
        self.existed_before || self.user_added() || self.must_add()
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    pub(crate) fn set_value_after(&mut self, value: i64) {
        self.value_after = value;
    }

    /// Load the first value of `attribute` from `record`.
    ///
    /// Returns `Ok(false)` when the record does not hold the attribute; the
    /// slot is left untouched in that case and on every error.
    pub fn load_from_record(
        &mut self,
        record: &Entry,
        attribute: AttributeId,
        kind: ValueKind,
        origin: Origin,
    ) -> Result<bool, SlotError> {
        self.check_binding(attribute, kind)?;
        let Some(raw) = record.first_value(attribute) else {
            return Ok(false);
        };
        let value = convert_value(attribute, kind, raw)?;
        self.bind(attribute, kind);
        match origin {
            Origin::Stored => {
                self.value_before = value;
                self.value_after = value;
                self.existed_before = true;
            }
            Origin::Incoming => self.record_add(value),
        }
        Ok(true)
    }

    /// Load one element of the pending modification list.
    ///
    /// Replace with no values counts as a delete, replace with values as an
    /// add. A later call supersedes the pending event of an earlier one.
    pub fn load_from_modification(
        &mut self,
        modification: &Modification,
        kind: ValueKind,
    ) -> Result<(), SlotError> {
        let attribute = modification.attribute;
        self.check_binding(attribute, kind)?;

        let adding = match modification.op {
            ModOp::Add => true,
            ModOp::Delete => false,
            ModOp::Replace => !modification.values.is_empty(),
            ModOp::Increment => {
                return Err(SlotError::UnsupportedOperation {
                    op: modification.op,
                    attribute,
                });
            }
        };

        if adding {
            let raw = modification
                .first_value()
                .ok_or(SlotError::MissingValue { attribute })?;
            let value = convert_value(attribute, kind, raw)?;
            self.bind(attribute, kind);
            self.record_add(value);
        } else {
            self.bind(attribute, kind);
            self.pending = Pending::Delete;
            self.value_incoming = 0;
            self.value_after = 0;
        }
        Ok(())
    }

    fn record_add(&mut self, value: i64) {
        self.pending = Pending::Add;
        self.value_incoming = value;
        self.value_after = value;
    }

    fn check_binding(&self, attribute: AttributeId, kind: ValueKind) -> Result<(), SlotError> {
        if let Some(bound) = self.identity {
            if bound != attribute {
                return Err(SlotError::IdentityMismatch {
                    bound,
                    requested: attribute,
                });
            }
        }
        if let Some(bound) = self.kind {
            if bound != kind {
                return Err(SlotError::KindMismatch {
                    attribute,
                    bound,
                    requested: kind,
                });
            }
        }
        Ok(())
    }

    fn bind(&mut self, attribute: AttributeId, kind: ValueKind) {
        self.identity = Some(attribute);
        self.kind = Some(kind);
    }
}

fn convert_value(attribute: AttributeId, kind: ValueKind, raw: &str) -> Result<i64, SlotError> {
    let at = registry()
        .get(attribute)
        .ok_or_else(|| CoreError::UnknownAttribute(attribute.to_string()))?;
    Ok(convert(at, kind, raw)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
