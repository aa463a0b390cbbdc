//! Settings types.
//!
//! JSON keys are camelCase; every field has a compiled default so a partial
//! file is enough.

use serde::{Deserialize, Serialize};

use pwdshadow_core::attributes::names;
use pwdshadow_core::{Syntax, registry};

use crate::errors::{Result, SettingsError};

/// Engine configuration snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowSettings {
    /// Let RFC 2307 `shadow*` attributes override generated values.
    pub overrides: bool,
    /// Read age limits from the governing password policy record.
    pub use_policies: bool,
    /// Compute `pwdShadowExpire` when the policy does not say.
    pub auto_expire: bool,
    /// Policy DN for records without their own policy pointer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<String>,
    /// Attribute naming a record's policy; must have DN syntax.
    pub policy_attribute: String,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            overrides: true,
            use_policies: true,
            auto_expire: false,
            default_policy: None,
            policy_attribute: names::PWD_SHADOW_POLICY_SUBENTRY.to_owned(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ShadowSettings {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let reg = registry();
        let Some(at) = reg.lookup(&self.policy_attribute).and_then(|id| reg.get(id)) else {
            return Err(SettingsError::InvalidValue(format!(
                "policyAttribute {:?} is not a known attribute type",
                self.policy_attribute
            )));
        };
        if at.syntax != Syntax::DistinguishedName {
            return Err(SettingsError::InvalidValue(format!(
                "policyAttribute {} must have DN ({}) syntax",
                at.name,
                Syntax::DistinguishedName.oid()
            )));
        }

        if let Some(dn) = &self.default_policy {
            if dn.trim().is_empty() || !dn.contains('=') {
                return Err(SettingsError::InvalidValue(format!(
                    "defaultPolicy {dn:?} is not a distinguished name"
                )));
            }
        }

        Ok(())
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`EnvFilter` directive syntax).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_match_overlay() {
        let s = ShadowSettings::default();
        assert!(s.overrides);
        assert!(s.use_policies);
        assert!(!s.auto_expire);
        assert_eq!(s.default_policy, None);
        assert_eq!(s.policy_attribute, "pwdShadowPolicySubentry");
        assert_eq!(s.logging.level, "warn");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: ShadowSettings = serde_json::from_str(r#"{"overrides": false}"#).unwrap();
        assert!(!s.overrides);
        assert!(s.use_policies);
        assert_eq!(s.logging.format, LogFormat::Compact);
    }

    #[test]
    fn camel_case_keys() {
        let json = serde_json::to_value(ShadowSettings::default()).unwrap();
        assert!(json.get("usePolicies").is_some());
        assert!(json.get("policyAttribute").is_some());
        assert!(json.get("defaultPolicy").is_none());
    }

    #[test]
    fn ppolicy_pointer_is_accepted() {
        let s = ShadowSettings {
            policy_attribute: "pwdPolicySubentry".into(),
            ..ShadowSettings::default()
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn non_dn_policy_attribute_rejected() {
        let s = ShadowSettings {
            policy_attribute: "shadowMax".into(),
            ..ShadowSettings::default()
        };
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("DN"));
    }

    #[test]
    fn unknown_policy_attribute_rejected() {
        let s = ShadowSettings {
            policy_attribute: "noSuchAttr".into(),
            ..ShadowSettings::default()
        };
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn malformed_default_policy_rejected() {
        let s = ShadowSettings {
            default_policy: Some("  ".into()),
            ..ShadowSettings::default()
        };
        assert_matches!(s.validate(), Err(SettingsError::InvalidValue(_)));

        let s = ShadowSettings {
            default_policy: Some("cn=default,ou=policies,dc=example,dc=org".into()),
            ..ShadowSettings::default()
        };
        assert!(s.validate().is_ok());
    }
}
