//! Turns slot outcomes into record changes.

use serde::Serialize;
use tracing::debug;

use pwdshadow_core::{Entry, Modification};

use crate::rules::EMIT_ORDER;
use crate::slot::Outcome;
use crate::state::{RequestState, Tracked};

/// What happened to one derived attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum Change {
    /// Written where there was no value.
    Added {
        /// Derived attribute.
        attribute: Tracked,
        /// New value.
        value: i64,
    },
    /// Rewritten with a different value.
    Replaced {
        /// Derived attribute.
        attribute: Tracked,
        /// Stored value.
        from: i64,
        /// New value.
        to: i64,
    },
    /// Removed.
    Deleted {
        /// Derived attribute.
        attribute: Tracked,
    },
}

impl Change {
    /// Derived attribute the change applies to.
    pub fn attribute(&self) -> Tracked {
        match *self {
            Self::Added { attribute, .. }
            | Self::Replaced { attribute, .. }
            | Self::Deleted { attribute } => attribute,
        }
    }
}

/// Summary of one create or update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Changes in emission order.
    pub changes: Vec<Change>,
}

impl Report {
    /// No derived attribute changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of attributes added.
    pub fn added(&self) -> usize {
        self.count(|c| matches!(c, Change::Added { .. }))
    }

    /// Number of attributes replaced.
    pub fn replaced(&self) -> usize {
        self.count(|c| matches!(c, Change::Replaced { .. }))
    }

    /// Number of attributes deleted.
    pub fn deleted(&self) -> usize {
        self.count(|c| matches!(c, Change::Deleted { .. }))
    }

    /// Change recorded for `attribute`, if any.
    pub fn change(&self, attribute: Tracked) -> Option<&Change> {
        self.changes.iter().find(|c| c.attribute() == attribute)
    }

    fn count(&self, pred: impl Fn(&Change) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }
}

fn decide(state: &RequestState, target: Tracked) -> Option<Change> {
    let slot = &state[target];
    if slot.user_modified() {
        debug!(attribute = %target, "derived attribute modified by request, leaving as is");
        return None;
    }
    match slot.outcome() {
        Outcome::Unchanged => None,
        Outcome::MustDelete => Some(Change::Deleted { attribute: target }),
        Outcome::MustAdd { .. } if slot.existed_before() => Some(Change::Replaced {
            attribute: target,
            from: slot.value_before(),
            to: slot.value_after(),
        }),
        Outcome::MustAdd { .. } => Some(Change::Added {
            attribute: target,
            value: slot.value_after(),
        }),
    }
}

/// Append the operations for every decided target to `mods`.
///
/// Each target gets a delete of all values, followed by a replace carrying
/// the new value unless the target is being removed. Operations are marked
/// internal.
pub fn emit(state: &RequestState, mods: &mut Vec<Modification>) -> Report {
    let mut report = Report::default();
    for target in EMIT_ORDER {
        let Some(change) = decide(state, target) else {
            continue;
        };
        let Some(id) = state[target].identity() else {
            continue;
        };
        mods.push(Modification::delete_all(id).internal());
        if let Change::Added { value, .. } | Change::Replaced { to: value, .. } = change {
            mods.push(Modification::replace(id, [value.to_string()]).internal());
        }
        report.changes.push(change);
    }
    report
}

/// Write every added target straight into a record being created.
pub fn assign(state: &RequestState, record: &mut Entry) -> Report {
    let mut report = Report::default();
    for target in EMIT_ORDER {
        let Some(change) = decide(state, target) else {
            continue;
        };
        let (Change::Added { value, .. } | Change::Replaced { to: value, .. }) = change else {
            continue;
        };
        let Some(id) = state[target].identity() else {
            continue;
        };
        record.merge_one(id, value.to_string());
        report.changes.push(change);
    }
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
