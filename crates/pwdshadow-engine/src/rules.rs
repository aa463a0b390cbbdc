//! Derivation rules.
//!
//! ## Rules (evaluation order)
//! - `pwdShadowFlag` ← `shadowFlag`
//! - `pwdShadowInactive` ← `shadowInactive` | `pwdGraceExpiry`
//! - `pwdShadowLastChange` ← `shadowLastChange` | `userPassword`, then last-change synthesis
//! - `pwdShadowMax` ← `shadowMax` | `pwdMaxAge`
//! - `pwdShadowMin` ← `shadowMin` | `pwdMinAge`
//! - `pwdShadowWarning` ← `shadowWarning` | `pwdExpireWarning`
//! - `pwdShadowExpire` ← `shadowExpire` | last change, auto-expire, max age,
//!   grace expiry, end time, then expiration synthesis
//!
//! Expiration reads the outcome of the last-change, max and inactive rules,
//! so it runs last.

use crate::state::Tracked;

/// Extra value computation after the precheck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Synthesis {
    /// Day of the password change.
    LastChange,
    /// Account end day.
    Expiration,
}

/// Static description of how one derived attribute is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivationRule {
    /// Derived attribute.
    pub target: Tracked,
    /// Attribute whose value wins when present.
    pub override_source: Option<Tracked>,
    /// Attributes that make the target exist, in priority order.
    pub triggers: &'static [Tracked],
    /// Value computation replacing the trigger value.
    pub synthesis: Option<Synthesis>,
}

/// Every rule, in evaluation order.
pub static RULES: [DerivationRule; 7] = [
    DerivationRule {
        target: Tracked::PwdShadowFlag,
        override_source: Some(Tracked::ShadowFlag),
        triggers: &[],
        synthesis: None,
    },
    DerivationRule {
        target: Tracked::PwdShadowInactive,
        override_source: Some(Tracked::ShadowInactive),
        triggers: &[Tracked::PwdGraceExpiry],
        synthesis: None,
    },
    DerivationRule {
        target: Tracked::PwdShadowLastChange,
        override_source: Some(Tracked::ShadowLastChange),
        triggers: &[Tracked::UserPassword],
        synthesis: Some(Synthesis::LastChange),
    },
    DerivationRule {
        target: Tracked::PwdShadowMax,
        override_source: Some(Tracked::ShadowMax),
        triggers: &[Tracked::PwdMaxAge],
        synthesis: None,
    },
    DerivationRule {
        target: Tracked::PwdShadowMin,
        override_source: Some(Tracked::ShadowMin),
        triggers: &[Tracked::PwdMinAge],
        synthesis: None,
    },
    DerivationRule {
        target: Tracked::PwdShadowWarning,
        override_source: Some(Tracked::ShadowWarning),
        triggers: &[Tracked::PwdExpireWarning],
        synthesis: None,
    },
    DerivationRule {
        target: Tracked::PwdShadowExpire,
        override_source: Some(Tracked::ShadowExpire),
        triggers: &[
            Tracked::PwdShadowLastChange,
            Tracked::PwdShadowAutoExpire,
            Tracked::PwdMaxAge,
            Tracked::PwdGraceExpiry,
            Tracked::PwdEndTime,
        ],
        synthesis: Some(Synthesis::Expiration),
    },
];

/// Order in which derived attributes are written out.
pub const EMIT_ORDER: [Tracked; 7] = [
    Tracked::PwdShadowExpire,
    Tracked::PwdShadowFlag,
    Tracked::PwdShadowInactive,
    Tracked::PwdShadowLastChange,
    Tracked::PwdShadowMax,
    Tracked::PwdShadowMin,
    Tracked::PwdShadowWarning,
];

/// Attributes whose modification makes a request worth evaluating.
pub const SOURCES: [Tracked; 11] = [
    Tracked::PwdEndTime,
    Tracked::PolicySubentry,
    Tracked::PwdShadowGenerate,
    Tracked::ShadowExpire,
    Tracked::ShadowFlag,
    Tracked::ShadowLastChange,
    Tracked::ShadowMin,
    Tracked::ShadowMax,
    Tracked::ShadowWarning,
    Tracked::ShadowInactive,
    Tracked::UserPassword,
];

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
