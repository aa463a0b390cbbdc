//! Tracked attributes and the per-request state that holds their slots.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;
use tracing::warn;

use pwdshadow_core::attributes::names;
use pwdshadow_core::{AttributeId, AttributeRegistry, CoreError, Entry, Modification, ValueKind};

use crate::slot::{Origin, Slot};

/// Every attribute the engine reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tracked {
    /// Derived `pwdShadowExpire`.
    PwdShadowExpire,
    /// Derived `pwdShadowFlag`.
    PwdShadowFlag,
    /// Derived `pwdShadowInactive`.
    PwdShadowInactive,
    /// Derived `pwdShadowLastChange`.
    PwdShadowLastChange,
    /// Derived `pwdShadowMax`.
    PwdShadowMax,
    /// Derived `pwdShadowMin`.
    PwdShadowMin,
    /// Derived `pwdShadowWarning`.
    PwdShadowWarning,
    /// Per-record generation switch.
    PwdShadowGenerate,
    /// Policy switch for expiration synthesis.
    PwdShadowAutoExpire,
    /// Record's policy pointer (configurable attribute).
    PolicySubentry,
    /// `pwdChangedTime`.
    PwdChangedTime,
    /// `pwdEndTime`.
    PwdEndTime,
    /// Policy `pwdExpireWarning`.
    PwdExpireWarning,
    /// Policy `pwdGraceExpiry`.
    PwdGraceExpiry,
    /// Policy `pwdMaxAge`.
    PwdMaxAge,
    /// Policy `pwdMinAge`.
    PwdMinAge,
    /// Override `shadowExpire`.
    ShadowExpire,
    /// Override `shadowFlag`.
    ShadowFlag,
    /// Override `shadowInactive`.
    ShadowInactive,
    /// Override `shadowLastChange`.
    ShadowLastChange,
    /// Override `shadowMax`.
    ShadowMax,
    /// Override `shadowMin`.
    ShadowMin,
    /// Override `shadowWarning`.
    ShadowWarning,
    /// `userPassword`.
    UserPassword,
}

/// Role of a tracked attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    /// Computed by the engine.
    Derived,
    /// Record-level switches and pointers.
    Control,
    /// Record attributes that feed derivation.
    Record,
    /// RFC 2307 values that take precedence over derivation.
    Override,
    /// Read from the policy record only.
    Policy,
}

impl Tracked {
    /// Number of tracked attributes.
    pub const COUNT: usize = 24;

    /// All tracked attributes, in slot order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::PwdShadowExpire,
        Self::PwdShadowFlag,
        Self::PwdShadowInactive,
        Self::PwdShadowLastChange,
        Self::PwdShadowMax,
        Self::PwdShadowMin,
        Self::PwdShadowWarning,
        Self::PwdShadowGenerate,
        Self::PwdShadowAutoExpire,
        Self::PolicySubentry,
        Self::PwdChangedTime,
        Self::PwdEndTime,
        Self::PwdExpireWarning,
        Self::PwdGraceExpiry,
        Self::PwdMaxAge,
        Self::PwdMinAge,
        Self::ShadowExpire,
        Self::ShadowFlag,
        Self::ShadowInactive,
        Self::ShadowLastChange,
        Self::ShadowMax,
        Self::ShadowMin,
        Self::ShadowWarning,
        Self::UserPassword,
    ];

    /// Slot index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// How values of this attribute are converted.
    pub fn kind(self) -> ValueKind {
        match self {
            Self::PwdShadowExpire
            | Self::PwdShadowInactive
            | Self::PwdShadowLastChange
            | Self::PwdShadowMax
            | Self::PwdShadowMin
            | Self::PwdShadowWarning
            | Self::ShadowExpire
            | Self::ShadowInactive
            | Self::ShadowLastChange
            | Self::ShadowMax
            | Self::ShadowMin
            | Self::ShadowWarning => ValueKind::Days,
            Self::PwdShadowFlag | Self::ShadowFlag => ValueKind::Integer,
            Self::PwdShadowGenerate | Self::PwdShadowAutoExpire => ValueKind::Boolean,
            Self::PolicySubentry | Self::UserPassword => ValueKind::Exists,
            Self::PwdChangedTime | Self::PwdEndTime => ValueKind::Time,
            Self::PwdExpireWarning | Self::PwdGraceExpiry | Self::PwdMaxAge | Self::PwdMinAge => {
                ValueKind::Seconds
            }
        }
    }

    /// Role of the attribute.
    pub fn group(self) -> Group {
        match self {
            Self::PwdShadowExpire
            | Self::PwdShadowFlag
            | Self::PwdShadowInactive
            | Self::PwdShadowLastChange
            | Self::PwdShadowMax
            | Self::PwdShadowMin
            | Self::PwdShadowWarning => Group::Derived,
            Self::PwdShadowGenerate | Self::PolicySubentry => Group::Control,
            Self::PwdChangedTime | Self::PwdEndTime | Self::UserPassword => Group::Record,
            Self::ShadowExpire
            | Self::ShadowFlag
            | Self::ShadowInactive
            | Self::ShadowLastChange
            | Self::ShadowMax
            | Self::ShadowMin
            | Self::ShadowWarning => Group::Override,
            Self::PwdShadowAutoExpire
            | Self::PwdExpireWarning
            | Self::PwdGraceExpiry
            | Self::PwdMaxAge
            | Self::PwdMinAge => Group::Policy,
        }
    }

    /// Fixed attribute name; `None` for the configurable policy pointer.
    pub fn attribute_name(self) -> Option<&'static str> {
        let name = match self {
            Self::PwdShadowExpire => names::PWD_SHADOW_EXPIRE,
            Self::PwdShadowFlag => names::PWD_SHADOW_FLAG,
            Self::PwdShadowInactive => names::PWD_SHADOW_INACTIVE,
            Self::PwdShadowLastChange => names::PWD_SHADOW_LAST_CHANGE,
            Self::PwdShadowMax => names::PWD_SHADOW_MAX,
            Self::PwdShadowMin => names::PWD_SHADOW_MIN,
            Self::PwdShadowWarning => names::PWD_SHADOW_WARNING,
            Self::PwdShadowGenerate => names::PWD_SHADOW_GENERATE,
            Self::PwdShadowAutoExpire => names::PWD_SHADOW_AUTO_EXPIRE,
            Self::PolicySubentry => return None,
            Self::PwdChangedTime => names::PWD_CHANGED_TIME,
            Self::PwdEndTime => names::PWD_END_TIME,
            Self::PwdExpireWarning => names::PWD_EXPIRE_WARNING,
            Self::PwdGraceExpiry => names::PWD_GRACE_EXPIRY,
            Self::PwdMaxAge => names::PWD_MAX_AGE,
            Self::PwdMinAge => names::PWD_MIN_AGE,
            Self::ShadowExpire => names::SHADOW_EXPIRE,
            Self::ShadowFlag => names::SHADOW_FLAG,
            Self::ShadowInactive => names::SHADOW_INACTIVE,
            Self::ShadowLastChange => names::SHADOW_LAST_CHANGE,
            Self::ShadowMax => names::SHADOW_MAX,
            Self::ShadowMin => names::SHADOW_MIN,
            Self::ShadowWarning => names::SHADOW_WARNING,
            Self::UserPassword => names::USER_PASSWORD,
        };
        Some(name)
    }
}

impl fmt::Display for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name().unwrap_or("policySubentry"))
    }
}

/// Attribute identity of every tracked attribute, resolved once per engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bindings {
    ids: [AttributeId; Tracked::COUNT],
}

impl Bindings {
    /// Resolve every tracked attribute in `registry`, using
    /// `policy_attribute` for the policy pointer.
    pub fn resolve(registry: &AttributeRegistry, policy_attribute: AttributeId) -> Result<Self, CoreError> {
        let mut ids = [policy_attribute; Tracked::COUNT];
        for tracked in Tracked::ALL {
            if let Some(name) = tracked.attribute_name() {
                ids[tracked.index()] = registry.require(name)?;
            }
        }
        Ok(Self { ids })
    }

    /// Identity of `tracked`.
    pub fn id(&self, tracked: Tracked) -> AttributeId {
        self.ids[tracked.index()]
    }

    /// Tracked attribute with identity `id`, if any.
    pub fn lookup(&self, id: AttributeId) -> Option<Tracked> {
        Tracked::ALL.into_iter().find(|t| self.ids[t.index()] == id)
    }
}

/// All slots for one create or update, plus request-wide switches.
///
/// Built fresh per request and dropped when the request finishes.
#[derive(Clone, Debug)]
pub struct RequestState {
    slots: [Slot; Tracked::COUNT],
    /// Generation is off for the record; derived attributes are retracted.
    pub purge: bool,
    /// Expiration may be computed from last change and maximum age.
    pub auto_expire: bool,
    /// Policy pointer named by the record or the request.
    pub policy_dn: Option<String>,
    /// DN of the policy record actually loaded, if any.
    pub policy: Option<String>,
}

impl RequestState {
    /// Zeroed state with every slot bound to its identity.
    pub fn new(bindings: &Bindings, auto_expire: bool) -> Self {
        Self {
            slots: Tracked::ALL.map(|t| Slot::bound(bindings.id(t))),
            purge: false,
            auto_expire,
            policy_dn: None,
            policy: None,
        }
    }

    /// Slot of `tracked`.
    pub fn slot(&self, tracked: Tracked) -> &Slot {
        &self.slots[tracked.index()]
    }

    /// Mutable slot of `tracked`.
    pub fn slot_mut(&mut self, tracked: Tracked) -> &mut Slot {
        &mut self.slots[tracked.index()]
    }

    /// Load `tracked` from `record`, logging and dropping failures.
    pub fn load_record_value(&mut self, record: &Entry, tracked: Tracked, origin: Origin) {
        let Some(id) = self[tracked].identity() else {
            return;
        };
        if let Err(err) = self[tracked].load_from_record(record, id, tracked.kind(), origin) {
            warn!(dn = record.dn(), attribute = %tracked, error = %err, "ignoring attribute value");
        }
    }

    /// Load one pending modification of `tracked`, logging and dropping
    /// failures. Returns whether the slot accepted it.
    pub fn load_modification(&mut self, tracked: Tracked, modification: &Modification) -> bool {
        match self[tracked].load_from_modification(modification, tracked.kind()) {
            Ok(()) => true,
            Err(err) => {
                warn!(attribute = %tracked, error = %err, "ignoring modification");
                false
            }
        }
    }

    /// Whether the record has generation switched off after this request.
    pub fn generation_disabled(&self) -> bool {
        self[Tracked::PwdShadowGenerate].value_after() == 0
    }
}

impl Index<Tracked> for RequestState {
    type Output = Slot;

    fn index(&self, tracked: Tracked) -> &Slot {
        self.slot(tracked)
    }
}

impl IndexMut<Tracked> for RequestState {
    fn index_mut(&mut self, tracked: Tracked) -> &mut Slot {
        self.slot_mut(tracked)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
