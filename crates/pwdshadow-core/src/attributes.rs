//! Attribute catalog and the process-wide identity table.
//!
//! Every attribute the engine reads or writes is resolved once to an
//! [`AttributeId`]. The table is built lazily on first access behind a
//! [`OnceLock`] and is read-only afterwards, so concurrent requests share it
//! without locking.
//!
//! The built-in catalog covers:
//! - pwdShadow generated attributes and their controls
//! - password policy attributes (draft-behera-ldap-password-policy)
//! - NIS shadow attributes (RFC 2307)
//! - `userPassword` (RFC 2256)

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{CoreError, Result};

/// Attribute names known to the built-in catalog.
pub mod names {
    /// Generated `shadowLastChange` equivalent.
    pub const PWD_SHADOW_LAST_CHANGE: &str = "pwdShadowLastChange";
    /// Generated `shadowMin` equivalent.
    pub const PWD_SHADOW_MIN: &str = "pwdShadowMin";
    /// Generated `shadowMax` equivalent.
    pub const PWD_SHADOW_MAX: &str = "pwdShadowMax";
    /// Generated `shadowWarning` equivalent.
    pub const PWD_SHADOW_WARNING: &str = "pwdShadowWarning";
    /// Generated `shadowInactive` equivalent.
    pub const PWD_SHADOW_INACTIVE: &str = "pwdShadowInactive";
    /// Generated `shadowExpire` equivalent.
    pub const PWD_SHADOW_EXPIRE: &str = "pwdShadowExpire";
    /// Generated `shadowFlag` equivalent.
    pub const PWD_SHADOW_FLAG: &str = "pwdShadowFlag";
    /// Per-record switch enabling generation.
    pub const PWD_SHADOW_GENERATE: &str = "pwdShadowGenerate";
    /// Policy switch enabling computed expiration.
    pub const PWD_SHADOW_AUTO_EXPIRE: &str = "pwdShadowAutoExpire";
    /// Default policy pointer attribute.
    pub const PWD_SHADOW_POLICY_SUBENTRY: &str = "pwdShadowPolicySubentry";

    /// Time of the last password change.
    pub const PWD_CHANGED_TIME: &str = "pwdChangedTime";
    /// Time after which the account may not authenticate.
    pub const PWD_END_TIME: &str = "pwdEndTime";
    /// Seconds before expiry during which warnings are sent.
    pub const PWD_EXPIRE_WARNING: &str = "pwdExpireWarning";
    /// Seconds after expiry during which grace binds are allowed.
    pub const PWD_GRACE_EXPIRY: &str = "pwdGraceExpiry";
    /// Maximum password age in seconds.
    pub const PWD_MAX_AGE: &str = "pwdMaxAge";
    /// Minimum password age in seconds.
    pub const PWD_MIN_AGE: &str = "pwdMinAge";
    /// Password policy pointer used by the ppolicy overlay.
    pub const PWD_POLICY_SUBENTRY: &str = "pwdPolicySubentry";

    /// RFC 2307 `shadowExpire`.
    pub const SHADOW_EXPIRE: &str = "shadowExpire";
    /// RFC 2307 `shadowFlag`.
    pub const SHADOW_FLAG: &str = "shadowFlag";
    /// RFC 2307 `shadowInactive`.
    pub const SHADOW_INACTIVE: &str = "shadowInactive";
    /// RFC 2307 `shadowLastChange`.
    pub const SHADOW_LAST_CHANGE: &str = "shadowLastChange";
    /// RFC 2307 `shadowMax`.
    pub const SHADOW_MAX: &str = "shadowMax";
    /// RFC 2307 `shadowMin`.
    pub const SHADOW_MIN: &str = "shadowMin";
    /// RFC 2307 `shadowWarning`.
    pub const SHADOW_WARNING: &str = "shadowWarning";

    /// RFC 2256 `userPassword`.
    pub const USER_PASSWORD: &str = "userPassword";
}

/// LDAP attribute syntaxes relevant to conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Syntax {
    /// `1.3.6.1.4.1.1466.115.121.1.7`
    Boolean,
    /// `1.3.6.1.4.1.1466.115.121.1.27`
    Integer,
    /// `1.3.6.1.4.1.1466.115.121.1.24`
    GeneralizedTime,
    /// `1.3.6.1.4.1.1466.115.121.1.12`
    DistinguishedName,
    /// `1.3.6.1.4.1.1466.115.121.1.15`
    DirectoryString,
    /// `1.3.6.1.4.1.1466.115.121.1.40`
    OctetString,
}

impl Syntax {
    /// Numeric OID of the syntax.
    pub fn oid(self) -> &'static str {
        match self {
            Self::Boolean => "1.3.6.1.4.1.1466.115.121.1.7",
            Self::Integer => "1.3.6.1.4.1.1466.115.121.1.27",
            Self::GeneralizedTime => "1.3.6.1.4.1.1466.115.121.1.24",
            Self::DistinguishedName => "1.3.6.1.4.1.1466.115.121.1.12",
            Self::DirectoryString => "1.3.6.1.4.1.1466.115.121.1.15",
            Self::OctetString => "1.3.6.1.4.1.1466.115.121.1.40",
        }
    }

    /// RFC 4517 description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Integer => "INTEGER",
            Self::GeneralizedTime => "Generalized Time",
            Self::DistinguishedName => "DN",
            Self::DirectoryString => "Directory String",
            Self::OctetString => "Octet String",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Stable identity of an attribute type within the identity table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(u16);

impl AttributeId {
    /// Position of the attribute in its registry.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match registry().get(*self) {
            Some(at) => f.write_str(&at.name),
            None => write!(f, "#{}", self.0),
        }
    }
}

/// Declaration of one attribute type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeType {
    /// Canonical attribute name.
    pub name: String,
    /// Numeric OID.
    pub oid: String,
    /// Declared value syntax.
    pub syntax: Syntax,
}

impl AttributeType {
    /// Create an attribute type declaration.
    pub fn new(name: impl Into<String>, oid: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            name: name.into(),
            oid: oid.into(),
            syntax,
        }
    }
}

/// `(name, oid, syntax)`
const BUILTIN: &[(&str, &str, Syntax)] = &[
    // pwdShadow generated attributes
    (names::PWD_SHADOW_LAST_CHANGE, "1.3.6.1.4.1.27893.4.2.1.5", Syntax::Integer),
    (names::PWD_SHADOW_MIN, "1.3.6.1.4.1.27893.4.2.1.6", Syntax::Integer),
    (names::PWD_SHADOW_MAX, "1.3.6.1.4.1.27893.4.2.1.7", Syntax::Integer),
    (names::PWD_SHADOW_WARNING, "1.3.6.1.4.1.27893.4.2.1.8", Syntax::Integer),
    (names::PWD_SHADOW_INACTIVE, "1.3.6.1.4.1.27893.4.2.1.9", Syntax::Integer),
    (names::PWD_SHADOW_EXPIRE, "1.3.6.1.4.1.27893.4.2.1.10", Syntax::Integer),
    (names::PWD_SHADOW_FLAG, "1.3.6.1.4.1.27893.4.2.1.11", Syntax::Integer),
    // pwdShadow controls
    (names::PWD_SHADOW_GENERATE, "1.3.6.1.4.1.27893.4.2.2.1", Syntax::Boolean),
    (names::PWD_SHADOW_AUTO_EXPIRE, "1.3.6.1.4.1.27893.4.2.2.2", Syntax::Boolean),
    (
        names::PWD_SHADOW_POLICY_SUBENTRY,
        "1.3.6.1.4.1.27893.4.2.2.3",
        Syntax::DistinguishedName,
    ),
    // password policy
    (names::PWD_MIN_AGE, "1.3.6.1.4.1.42.2.27.8.1.2", Syntax::Integer),
    (names::PWD_MAX_AGE, "1.3.6.1.4.1.42.2.27.8.1.3", Syntax::Integer),
    (names::PWD_EXPIRE_WARNING, "1.3.6.1.4.1.42.2.27.8.1.7", Syntax::Integer),
    (names::PWD_CHANGED_TIME, "1.3.6.1.4.1.42.2.27.8.1.16", Syntax::GeneralizedTime),
    (
        names::PWD_POLICY_SUBENTRY,
        "1.3.6.1.4.1.42.2.27.8.1.23",
        Syntax::DistinguishedName,
    ),
    (names::PWD_END_TIME, "1.3.6.1.4.1.42.2.27.8.1.28", Syntax::GeneralizedTime),
    (names::PWD_GRACE_EXPIRY, "1.3.6.1.4.1.42.2.27.8.1.30", Syntax::Integer),
    // RFC 2307
    (names::SHADOW_LAST_CHANGE, "1.3.6.1.1.1.1.5", Syntax::Integer),
    (names::SHADOW_MIN, "1.3.6.1.1.1.1.6", Syntax::Integer),
    (names::SHADOW_MAX, "1.3.6.1.1.1.1.7", Syntax::Integer),
    (names::SHADOW_WARNING, "1.3.6.1.1.1.1.8", Syntax::Integer),
    (names::SHADOW_INACTIVE, "1.3.6.1.1.1.1.9", Syntax::Integer),
    (names::SHADOW_EXPIRE, "1.3.6.1.1.1.1.10", Syntax::Integer),
    (names::SHADOW_FLAG, "1.3.6.1.1.1.1.11", Syntax::Integer),
    // RFC 2256
    (names::USER_PASSWORD, "2.5.4.35", Syntax::OctetString),
];

/// Immutable table of attribute types keyed by case-insensitive name.
#[derive(Clone, Debug)]
pub struct AttributeRegistry {
    types: Vec<AttributeType>,
    by_name: HashMap<String, AttributeId>,
}

impl AttributeRegistry {
    /// Registry holding only the built-in catalog.
    pub fn builtin() -> Self {
        Self::with_extra(Vec::new())
    }

    /// Registry holding the built-in catalog plus `extra` declarations.
    ///
    /// An extra declaration whose name collides with an existing one is
    /// skipped.
    pub fn with_extra(extra: impl IntoIterator<Item = AttributeType>) -> Self {
        let mut registry = Self {
            types: Vec::with_capacity(BUILTIN.len()),
            by_name: HashMap::new(),
        };

        for &(name, oid, syntax) in BUILTIN {
            registry.insert(AttributeType::new(name, oid, syntax));
        }

        for at in extra {
            if registry.lookup(&at.name).is_some() {
                warn!(attribute = %at.name, "duplicate attribute type ignored");
                continue;
            }
            registry.insert(at);
        }

        debug!(count = registry.types.len(), "attribute registry built");
        registry
    }

    fn insert(&mut self, at: AttributeType) {
        let Ok(raw) = u16::try_from(self.types.len()) else {
            warn!(attribute = %at.name, "attribute registry full");
            return;
        };
        let _ = self.by_name.insert(at.name.to_ascii_lowercase(), AttributeId(raw));
        self.types.push(at);
    }

    /// Resolve a name (case-insensitive) to its identity.
    pub fn lookup(&self, name: &str) -> Option<AttributeId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Resolve a name, failing with [`CoreError::UnknownAttribute`].
    pub fn require(&self, name: &str) -> Result<AttributeId> {
        self.lookup(name)
            .ok_or_else(|| CoreError::UnknownAttribute(name.to_owned()))
    }

    /// Declaration for an identity.
    pub fn get(&self, id: AttributeId) -> Option<&AttributeType> {
        self.types.get(id.index())
    }

    /// Canonical name for an identity, or `"<unknown>"`.
    pub fn name(&self, id: AttributeId) -> &str {
        self.get(id).map_or("<unknown>", |at| at.name.as_str())
    }

    /// Number of registered attribute types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Global identity table.
static REGISTRY: OnceLock<AttributeRegistry> = OnceLock::new();

/// Get the global identity table, building the built-in catalog on first use.
pub fn registry() -> &'static AttributeRegistry {
    REGISTRY.get_or_init(AttributeRegistry::builtin)
}

/// Build the global identity table with site-specific extra declarations.
///
/// Must run before the first call to [`registry`]; afterwards the table is
/// immutable and this returns [`CoreError::RegistryInitialized`].
pub fn init_registry(extra: Vec<AttributeType>) -> Result<()> {
    let mut built = false;
    let _ = REGISTRY.get_or_init(|| {
        built = true;
        AttributeRegistry::with_extra(extra)
    });
    if built {
        Ok(())
    } else {
        Err(CoreError::RegistryInitialized)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
