//! Property tests over randomly generated records, policies and requests.

use std::sync::Arc;

use proptest::option;
use proptest::prelude::*;

use pwdshadow_core::attributes::names;
use pwdshadow_core::{AttributeId, Entry, FixedClock, ModOp, Modification, SECONDS_PER_DAY, registry};
use pwdshadow_engine::{MemoryDirectory, ShadowEngine};
use pwdshadow_settings::ShadowSettings;

const DERIVED: [&str; 7] = [
    names::PWD_SHADOW_EXPIRE,
    names::PWD_SHADOW_FLAG,
    names::PWD_SHADOW_INACTIVE,
    names::PWD_SHADOW_LAST_CHANGE,
    names::PWD_SHADOW_MAX,
    names::PWD_SHADOW_MIN,
    names::PWD_SHADOW_WARNING,
];

fn id(name: &str) -> AttributeId {
    registry().require(name).unwrap()
}

fn with_opt(entry: Entry, name: &str, value: Option<String>) -> Entry {
    match value {
        Some(v) => entry.with(id(name), [v]),
        None => entry,
    }
}

#[derive(Clone, Debug)]
struct Policy {
    max_days: Option<i64>,
    min_days: Option<i64>,
    grace_days: Option<i64>,
    auto_expire: Option<bool>,
}

impl Policy {
    fn entry(&self, dn: &str) -> Entry {
        let secs = |d: Option<i64>| d.map(|d| (d * SECONDS_PER_DAY).to_string());
        let bool_str = |b: Option<bool>| b.map(|b| (if b { "TRUE" } else { "FALSE" }).to_owned());
        let e = with_opt(Entry::new(dn), names::PWD_MAX_AGE, secs(self.max_days));
        let e = with_opt(e, names::PWD_MIN_AGE, secs(self.min_days));
        let e = with_opt(e, names::PWD_GRACE_EXPIRY, secs(self.grace_days));
        with_opt(e, names::PWD_SHADOW_AUTO_EXPIRE, bool_str(self.auto_expire))
    }
}

prop_compose! {
    fn policy()(
        max_days in option::of(1i64..400),
        min_days in option::of(0i64..10),
        grace_days in option::of(0i64..30),
        auto_expire in option::of(any::<bool>()),
    ) -> Policy {
        Policy { max_days, min_days, grace_days, auto_expire }
    }
}

prop_compose! {
    fn record()(
        generate in prop_oneof![Just(None), Just(Some("TRUE")), Just(Some("FALSE"))],
        password in any::<bool>(),
        pointer in prop_oneof![Just(None), Just(Some("cn=strict")), Just(Some("cn=missing"))],
        end_time in prop_oneof![Just(None), Just(Some("20250101000000Z"))],
        shadow_max in option::of(0i64..400),
        shadow_flag in option::of(0i64..16),
        derived in proptest::collection::vec(option::of(0i64..30_000), DERIVED.len()),
    ) -> Entry {
        let e = with_opt(Entry::new("uid=prop"), names::PWD_SHADOW_GENERATE, generate.map(str::to_owned));
        let e = with_opt(e, names::USER_PASSWORD, password.then(|| "secret".to_owned()));
        let e = with_opt(e, names::PWD_SHADOW_POLICY_SUBENTRY, pointer.map(str::to_owned));
        let e = with_opt(e, names::PWD_END_TIME, end_time.map(str::to_owned));
        let e = with_opt(e, names::SHADOW_MAX, shadow_max.map(|v| v.to_string()));
        let mut e = with_opt(e, names::SHADOW_FLAG, shadow_flag.map(|v| v.to_string()));
        for (name, value) in DERIVED.iter().zip(derived) {
            e = with_opt(e, name, value.map(|v| v.to_string()));
        }
        e
    }
}

/// Requests touching only source attributes, with replace/delete semantics.
fn source_modification() -> impl Strategy<Value = Modification> {
    prop_oneof![
        Just(Modification::replace(id(names::USER_PASSWORD), ["changed"])),
        Just(Modification::delete_all(id(names::USER_PASSWORD))),
        (0i64..400).prop_map(|v| Modification::replace(id(names::SHADOW_MAX), [v.to_string()])),
        Just(Modification::delete_all(id(names::SHADOW_MAX))),
        (0i64..16).prop_map(|v| Modification::replace(id(names::SHADOW_FLAG), [v.to_string()])),
        Just(Modification::replace(id(names::PWD_SHADOW_GENERATE), ["TRUE"])),
        Just(Modification::replace(id(names::PWD_SHADOW_GENERATE), ["FALSE"])),
        Just(Modification::delete_all(id(names::PWD_SHADOW_GENERATE))),
        Just(Modification::replace(id(names::PWD_SHADOW_POLICY_SUBENTRY), ["cn=lax"])),
        Just(Modification::delete_all(id(names::PWD_END_TIME))),
    ]
}

fn engine(strict: &Policy, lax: &Policy, auto_expire: bool) -> ShadowEngine {
    let dir = MemoryDirectory::new();
    let _ = dir.insert(strict.entry("cn=strict"));
    let _ = dir.insert(lax.entry("cn=lax"));
    let settings = ShadowSettings {
        auto_expire,
        default_policy: Some("cn=lax".into()),
        ..ShadowSettings::default()
    };
    ShadowEngine::from_settings(&settings, Arc::new(dir))
        .unwrap()
        .with_clock(Arc::new(FixedClock::from_days(19_000)))
}

proptest! {
    #[test]
    fn second_pass_emits_nothing(
        strict in policy(),
        lax in policy(),
        auto_expire in any::<bool>(),
        existing in record(),
        request in proptest::collection::vec(source_modification(), 1..4),
    ) {
        let eng = engine(&strict, &lax, auto_expire);
        let mut mods = request;
        let _ = eng.on_update(&existing, &mut mods);

        let mut after = existing.clone();
        after.apply(&mods);

        let generate = id(names::PWD_SHADOW_GENERATE);
        let mut again = vec![Modification::replace(generate, after.values(generate).to_vec())];
        let report = eng.on_update(&after, &mut again);
        prop_assert!(report.is_empty(), "second pass changed {:?}", report.changes);
        prop_assert_eq!(again.len(), 1);
    }

    #[test]
    fn purge_only_deletes(
        strict in policy(),
        auto_expire in any::<bool>(),
        existing in record(),
    ) {
        let eng = engine(&strict, &strict, auto_expire);
        let mut mods = vec![Modification::delete_all(id(names::PWD_SHADOW_GENERATE))];
        let report = eng.on_update(&existing, &mut mods);

        prop_assert_eq!(report.added() + report.replaced(), 0);
        prop_assert!(mods[1..].iter().all(|m| m.op == ModOp::Delete && m.values.is_empty()));

        let mut after = existing.clone();
        after.apply(&mods);
        for name in DERIVED {
            prop_assert!(!after.contains(id(name)), "{} survived purge", name);
        }
    }

    #[test]
    fn added_override_is_final_value(
        strict in policy(),
        auto_expire in any::<bool>(),
        existing in record(),
        value in 0i64..400,
    ) {
        let eng = engine(&strict, &strict, auto_expire);
        let existing = existing.with(id(names::PWD_SHADOW_GENERATE), ["TRUE"]);
        let mut mods = vec![Modification::replace(id(names::SHADOW_MAX), [value.to_string()])];
        let _ = eng.on_update(&existing, &mut mods);

        let mut after = existing.clone();
        after.apply(&mods);
        prop_assert_eq!(after.values(id(names::PWD_SHADOW_MAX)), [value.to_string()]);
    }
}
