//! Engine configuration resolved from settings.

use pwdshadow_core::{AttributeId, registry};
use pwdshadow_settings::ShadowSettings;

use crate::errors::Result;

/// Immutable configuration snapshot used by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// `shadow*` attributes override derived values.
    pub overrides: bool,
    /// Read age limits from the policy record.
    pub use_policies: bool,
    /// Expiration synthesis when the policy does not say.
    pub auto_expire: bool,
    /// Policy DN for records without their own pointer.
    pub default_policy: Option<String>,
    /// Attribute naming a record's policy.
    pub policy_attribute: AttributeId,
}

impl EngineConfig {
    /// Validate `settings` and resolve attribute names.
    pub fn from_settings(settings: &ShadowSettings) -> Result<Self> {
        settings.validate()?;
        let policy_attribute = registry().require(&settings.policy_attribute)?;
        Ok(Self {
            overrides: settings.overrides,
            use_policies: settings.use_policies,
            auto_expire: settings.auto_expire,
            default_policy: settings.default_policy.clone(),
            policy_attribute,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
