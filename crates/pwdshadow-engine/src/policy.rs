//! Password policy lookup.
//!
//! The governing policy is the record's own pointer if it resolves, the
//! configured default otherwise. A policy that cannot be fetched is logged
//! and treated as "no policy data".

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use pwdshadow_core::Entry;

use crate::errors::StoreError;
use crate::slot::Origin;
use crate::state::{RequestState, Tracked};

/// Read access to directory entries.
pub trait EntryStore: Send + Sync {
    /// Fetch the entry at `dn`; `Ok(None)` when it does not exist.
    fn fetch(&self, dn: &str) -> Result<Option<Entry>, StoreError>;
}

/// In-memory [`EntryStore`] keyed by case-insensitive DN.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the one it replaced.
    pub fn insert(&self, entry: Entry) -> Option<Entry> {
        self.entries.write().insert(normalize_dn(entry.dn()), entry)
    }

    /// Remove the entry at `dn`.
    pub fn remove(&self, dn: &str) -> Option<Entry> {
        self.entries.write().remove(&normalize_dn(dn))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl EntryStore for MemoryDirectory {
    fn fetch(&self, dn: &str) -> Result<Option<Entry>, StoreError> {
        Ok(self.entries.read().get(&normalize_dn(dn)).cloned())
    }
}

fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",")
        .to_ascii_lowercase()
}

/// Loads policy-sourced trigger values into a request.
pub struct PolicyResolver<'a> {
    store: &'a dyn EntryStore,
    default_policy: Option<&'a str>,
}

impl<'a> PolicyResolver<'a> {
    /// Resolver reading from `store`, falling back to `default_policy`.
    pub fn new(store: &'a dyn EntryStore, default_policy: Option<&'a str>) -> Self {
        Self {
            store,
            default_policy,
        }
    }

    /// Fetch the governing policy and load its values into `state`.
    ///
    /// Returns the DN of the policy that was loaded, if any.
    pub fn resolve(&self, state: &mut RequestState) -> Option<String> {
        let candidates = [state.policy_dn.as_deref(), self.default_policy];
        let (dn, policy) = candidates
            .into_iter()
            .flatten()
            .find_map(|dn| self.fetch(dn).map(|entry| (dn.to_owned(), entry)))?;

        for tracked in [
            Tracked::PwdExpireWarning,
            Tracked::PwdGraceExpiry,
            Tracked::PwdMaxAge,
            Tracked::PwdMinAge,
            Tracked::PwdShadowAutoExpire,
        ] {
            state.load_record_value(&policy, tracked, Origin::Stored);
        }

        let auto_expire = state[Tracked::PwdShadowAutoExpire];
        if auto_expire.existed_before() {
            state.auto_expire = auto_expire.value_after() != 0;
        }

        debug!(policy = %dn, auto_expire = state.auto_expire, "password policy loaded");
        Some(dn)
    }

    fn fetch(&self, dn: &str) -> Option<Entry> {
        match self.store.fetch(dn) {
            Ok(Some(entry)) => Some(entry),
            Ok(None) | Err(StoreError::NotFound(_)) => {
                debug!(policy = dn, "password policy not found");
                None
            }
            Err(err) => {
                warn!(policy = dn, error = %err, "password policy unavailable");
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Bindings;
    use pwdshadow_core::attributes::names;
    use pwdshadow_core::logging::capture_logs;
    use pwdshadow_core::{AttributeId, registry};

    const DAY: i64 = 86_400;

    struct Unreachable;

    impl EntryStore for Unreachable {
        fn fetch(&self, _dn: &str) -> Result<Option<Entry>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    fn id(name: &str) -> AttributeId {
        registry().require(name).unwrap()
    }

    fn state(policy_dn: Option<&str>, auto_expire: bool) -> RequestState {
        let b = Bindings::resolve(registry(), id(names::PWD_SHADOW_POLICY_SUBENTRY)).unwrap();
        let mut st = RequestState::new(&b, auto_expire);
        st.policy_dn = policy_dn.map(str::to_owned);
        st
    }

    fn policy(dn: &str, max_days: i64) -> Entry {
        Entry::new(dn)
            .with(id(names::PWD_MAX_AGE), [(max_days * DAY).to_string()])
            .with(id(names::PWD_MIN_AGE), [DAY.to_string()])
            .with(id(names::PWD_EXPIRE_WARNING), [(7 * DAY).to_string()])
    }

    #[test]
    fn memory_directory_is_case_insensitive() {
        let dir = MemoryDirectory::new();
        assert!(dir.insert(Entry::new("cn=Default, ou=Policies")).is_none());
        assert!(dir.fetch("CN=default,OU=policies").unwrap().is_some());
        assert_eq!(dir.len(), 1);
        assert!(dir.remove("cn=default,ou=policies").is_some());
        assert!(dir.is_empty());
    }

    #[test]
    fn record_pointer_wins_over_default() {
        let dir = MemoryDirectory::new();
        let _ = dir.insert(policy("cn=record", 30));
        let _ = dir.insert(policy("cn=default", 90));
        let mut st = state(Some("cn=record"), false);

        let loaded = PolicyResolver::new(&dir, Some("cn=default")).resolve(&mut st);
        assert_eq!(loaded.as_deref(), Some("cn=record"));
        assert!(st[Tracked::PwdMaxAge].existed_before());
        assert_eq!(st[Tracked::PwdMaxAge].value_after(), 30);
        assert_eq!(st[Tracked::PwdMinAge].value_after(), 1);
        assert_eq!(st[Tracked::PwdExpireWarning].value_after(), 7);
        assert!(!st[Tracked::PwdGraceExpiry].existed_before());
    }

    #[test]
    fn missing_pointer_target_falls_back_to_default() {
        let dir = MemoryDirectory::new();
        let _ = dir.insert(policy("cn=default", 90));
        let mut st = state(Some("cn=gone"), false);

        let loaded = PolicyResolver::new(&dir, Some("cn=default")).resolve(&mut st);
        assert_eq!(loaded.as_deref(), Some("cn=default"));
        assert_eq!(st[Tracked::PwdMaxAge].value_after(), 90);
    }

    #[test]
    fn no_policy_loads_nothing() {
        let dir = MemoryDirectory::new();
        let mut st = state(None, false);
        assert_eq!(PolicyResolver::new(&dir, None).resolve(&mut st), None);
        assert!(!st[Tracked::PwdMaxAge].existed_before());
    }

    #[test]
    fn policy_switch_overrides_configured_auto_expire() {
        let dir = MemoryDirectory::new();
        let _ = dir.insert(policy("cn=on", 90).with(id(names::PWD_SHADOW_AUTO_EXPIRE), ["TRUE"]));
        let _ = dir.insert(policy("cn=off", 90).with(id(names::PWD_SHADOW_AUTO_EXPIRE), ["FALSE"]));
        let _ = dir.insert(policy("cn=unset", 90));

        let mut st = state(Some("cn=on"), false);
        let _ = PolicyResolver::new(&dir, None).resolve(&mut st);
        assert!(st.auto_expire);

        let mut st = state(Some("cn=off"), true);
        let _ = PolicyResolver::new(&dir, None).resolve(&mut st);
        assert!(!st.auto_expire);

        let mut st = state(Some("cn=unset"), true);
        let _ = PolicyResolver::new(&dir, None).resolve(&mut st);
        assert!(st.auto_expire);
    }

    #[test]
    fn unavailable_store_is_logged() {
        let (logs, _guard) = capture_logs();
        let mut st = state(Some("cn=record"), false);

        assert_eq!(PolicyResolver::new(&Unreachable, None).resolve(&mut st), None);
        let warned = logs.matching("password policy unavailable");
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0].field("policy"), Some("cn=record"));
    }

    #[test]
    fn malformed_policy_value_is_skipped() {
        let (logs, _guard) = capture_logs();
        let dir = MemoryDirectory::new();
        let _ = dir.insert(
            Entry::new("cn=bad")
                .with(id(names::PWD_MAX_AGE), ["forever"])
                .with(id(names::PWD_MIN_AGE), [DAY.to_string()]),
        );
        let mut st = state(Some("cn=bad"), false);

        let _ = PolicyResolver::new(&dir, None).resolve(&mut st);
        assert!(!st[Tracked::PwdMaxAge].existed_before());
        assert!(st[Tracked::PwdMinAge].existed_before());
        assert_eq!(logs.matching("ignoring attribute value").len(), 1);
    }
}
