//! Precheck/postcheck evaluation of the derivation rules.
//!
//! Each rule runs precheck (purge, override, triggers), then its synthesis
//! step if any, then postcheck, which drops writes that would not change
//! the stored value.

use tracing::debug;

use crate::rules::{DerivationRule, RULES, SOURCES, Synthesis};
use crate::slot::{Outcome, Slot};
use crate::state::{RequestState, Tracked};

/// Whether the request modifies any attribute derivation depends on.
pub fn touches_sources(state: &RequestState) -> bool {
    SOURCES.iter().any(|&t| state[t].user_modified())
}

/// Run every rule in order. `today` is the current day count.
pub fn run_rules(state: &mut RequestState, overrides: bool, today: i64) {
    for rule in &RULES {
        precheck(state, rule, overrides);
        match rule.synthesis {
            Some(Synthesis::LastChange) => synthesize_last_change(state, rule.target, today),
            Some(Synthesis::Expiration) => synthesize_expiration(state, rule.target),
            None => {}
        }
        postcheck(&mut state[rule.target]);

        let slot = &state[rule.target];
        debug!(
            attribute = %rule.target,
            outcome = ?slot.outcome(),
            before = slot.value_before(),
            after = slot.value_after(),
            "derived attribute evaluated"
        );
    }
}

/// Decide add/delete for `rule.target` from purge, override and triggers.
pub fn precheck(state: &mut RequestState, rule: &DerivationRule, overrides: bool) {
    if state.purge {
        let target = &mut state[rule.target];
        if target.existed_before() {
            target.set_outcome(Outcome::MustDelete);
        }
        return;
    }

    if overrides {
        if let Some(source) = rule.override_source {
            let source = state[source];
            let target = &mut state[rule.target];
            if source.user_added() {
                target.set_outcome(Outcome::MustAdd { overridden: true });
                target.set_value_after(source.value_after());
                return;
            }
            if source.existed_before() && !source.user_deleted() {
                if !target.existed_before() {
                    target.set_outcome(Outcome::MustAdd { overridden: true });
                }
                target.set_value_after(source.value_before());
                return;
            }
        }
    }

    // a trigger counts by its state after this request, so a derived trigger
    // already decided earlier in the same request is seen as decided
    let mut will_exist = false;
    for &trigger in rule.triggers {
        let trigger = state[trigger];
        let target = &mut state[rule.target];
        if trigger.user_added() || (trigger.will_exist() && !target.existed_before()) {
            target.set_outcome(Outcome::MustAdd { overridden: false });
            target.set_value_after(trigger.value_after());
        }
        if trigger.will_exist() {
            will_exist = true;
        }
    }

    let target = &mut state[rule.target];
    if target.existed_before() && !will_exist {
        target.set_outcome(Outcome::MustDelete);
    }
}

/// Drop a pending write that matches the stored value.
pub fn postcheck(slot: &mut Slot) {
    if slot.must_add() && slot.existed_before() && slot.value_after() == slot.value_before() {
        slot.set_outcome(Outcome::Unchanged);
    }
}

fn synthesize_last_change(state: &mut RequestState, target: Tracked, today: i64) {
    let slot = state[target];
    if !slot.must_add() || slot.overridden() {
        return;
    }
    let changed = state[Tracked::PwdChangedTime];
    let day = if state[Tracked::UserPassword].user_added() {
        today
    } else if changed.existed_before() {
        changed.value_after()
    } else {
        today
    };
    state[target].set_value_after(day);
}

fn synthesize_expiration(state: &mut RequestState, target: Tracked) {
    let slot = state[target];
    if !slot.must_add() || slot.overridden() {
        return;
    }

    let end = state[Tracked::PwdEndTime];
    let last_change = state[Tracked::PwdShadowLastChange];
    let max = state[Tracked::PwdShadowMax];
    let inactive = state[Tracked::PwdShadowInactive];

    let day = if end.will_exist() {
        Some(end.value_after())
    } else if state.auto_expire && last_change.will_exist() && max.will_exist() {
        let mut day = last_change.value_after().saturating_add(max.value_after());
        if inactive.will_exist() {
            day = day.saturating_add(inactive.value_after());
        }
        Some(day)
    } else {
        None
    };

    let slot = &mut state[target];
    match day {
        Some(day) => slot.set_value_after(day),
        None if slot.existed_before() => slot.set_outcome(Outcome::MustDelete),
        None => slot.set_outcome(Outcome::Unchanged),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Origin;
    use crate::state::Bindings;
    use pwdshadow_core::attributes::names;
    use pwdshadow_core::{Entry, Modification, registry};

    const DAY: i64 = 86_400;
    const TODAY: i64 = 19_500;

    fn state() -> RequestState {
        let reg = registry();
        let b = Bindings::resolve(reg, reg.require(names::PWD_SHADOW_POLICY_SUBENTRY).unwrap()).unwrap();
        RequestState::new(&b, false)
    }

    fn load(st: &mut RequestState, t: Tracked, raw: &str, origin: Origin) {
        let id = st[t].identity().unwrap();
        let record = Entry::new("uid=test").with(id, [raw]);
        st.load_record_value(&record, t, origin);
    }

    fn stored(st: &mut RequestState, t: Tracked, raw: &str) {
        load(st, t, raw, Origin::Stored);
    }

    fn added(st: &mut RequestState, t: Tracked, raw: &str) {
        load(st, t, raw, Origin::Incoming);
    }

    fn rule(target: Tracked) -> &'static DerivationRule {
        RULES.iter().find(|r| r.target == target).unwrap()
    }

    #[test]
    fn purge_deletes_existing_targets_only() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowMax, "90");
        stored(&mut st, Tracked::PwdMaxAge, &(45 * DAY).to_string());
        st.purge = true;

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowMax].outcome(), Outcome::MustDelete);
        assert_eq!(st[Tracked::PwdShadowMin].outcome(), Outcome::Unchanged);
    }

    #[test]
    fn added_override_wins_over_trigger() {
        let mut st = state();
        added(&mut st, Tracked::ShadowMax, "30");
        stored(&mut st, Tracked::PwdMaxAge, &(45 * DAY).to_string());

        precheck(&mut st, rule(Tracked::PwdShadowMax), true);
        let slot = st[Tracked::PwdShadowMax];
        assert_eq!(slot.outcome(), Outcome::MustAdd { overridden: true });
        assert_eq!(slot.value_after(), 30);
    }

    #[test]
    fn overrides_disabled_falls_through_to_triggers() {
        let mut st = state();
        added(&mut st, Tracked::ShadowMax, "30");
        stored(&mut st, Tracked::PwdMaxAge, &(45 * DAY).to_string());

        precheck(&mut st, rule(Tracked::PwdShadowMax), false);
        let slot = st[Tracked::PwdShadowMax];
        assert_eq!(slot.outcome(), Outcome::MustAdd { overridden: false });
        assert_eq!(slot.value_after(), 45);
    }

    #[test]
    fn stored_override_adds_missing_target() {
        let mut st = state();
        stored(&mut st, Tracked::ShadowWarning, "7");

        precheck(&mut st, rule(Tracked::PwdShadowWarning), true);
        let slot = st[Tracked::PwdShadowWarning];
        assert_eq!(slot.outcome(), Outcome::MustAdd { overridden: true });
        assert_eq!(slot.value_after(), 7);
    }

    #[test]
    fn stored_override_leaves_existing_target() {
        let mut st = state();
        stored(&mut st, Tracked::ShadowWarning, "7");
        stored(&mut st, Tracked::PwdShadowWarning, "7");

        precheck(&mut st, rule(Tracked::PwdShadowWarning), true);
        assert_eq!(st[Tracked::PwdShadowWarning].outcome(), Outcome::Unchanged);
    }

    #[test]
    fn deleted_override_hands_back_to_triggers() {
        let mut st = state();
        stored(&mut st, Tracked::ShadowMax, "30");
        stored(&mut st, Tracked::PwdShadowMax, "30");
        stored(&mut st, Tracked::PwdMaxAge, &(45 * DAY).to_string());
        let id = st[Tracked::ShadowMax].identity().unwrap();
        assert!(st.load_modification(Tracked::ShadowMax, &Modification::delete_all(id)));

        precheck(&mut st, rule(Tracked::PwdShadowMax), true);
        // target already exists, so the stored trigger does not force a rewrite
        assert_eq!(st[Tracked::PwdShadowMax].outcome(), Outcome::Unchanged);
    }

    #[test]
    fn trigger_adds_missing_target() {
        let mut st = state();
        stored(&mut st, Tracked::PwdGraceExpiry, &(3 * DAY).to_string());

        precheck(&mut st, rule(Tracked::PwdShadowInactive), true);
        let slot = st[Tracked::PwdShadowInactive];
        assert_eq!(slot.outcome(), Outcome::MustAdd { overridden: false });
        assert_eq!(slot.value_after(), 3);
    }

    #[test]
    fn lost_trigger_deletes_target() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowMin, "1");

        precheck(&mut st, rule(Tracked::PwdShadowMin), true);
        assert_eq!(st[Tracked::PwdShadowMin].outcome(), Outcome::MustDelete);
    }

    #[test]
    fn deleted_trigger_deletes_target() {
        let mut st = state();
        stored(&mut st, Tracked::UserPassword, "secret");
        stored(&mut st, Tracked::PwdShadowLastChange, "18000");
        let id = st[Tracked::UserPassword].identity().unwrap();
        assert!(st.load_modification(Tracked::UserPassword, &Modification::delete_all(id)));

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowLastChange].outcome(), Outcome::MustDelete);
    }

    #[test]
    fn retracted_last_change_retracts_expiration() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowLastChange, "18000");
        stored(&mut st, Tracked::PwdShadowExpire, "18090");

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowLastChange].outcome(), Outcome::MustDelete);
        assert_eq!(st[Tracked::PwdShadowExpire].outcome(), Outcome::MustDelete);
    }

    #[test]
    fn postcheck_drops_unchanged_write() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowMax, "30");
        added(&mut st, Tracked::ShadowMax, "30");

        precheck(&mut st, rule(Tracked::PwdShadowMax), true);
        assert!(st[Tracked::PwdShadowMax].must_add());
        postcheck(&mut st[Tracked::PwdShadowMax]);
        assert_eq!(st[Tracked::PwdShadowMax].outcome(), Outcome::Unchanged);
    }

    #[test]
    fn password_change_stamps_today() {
        let mut st = state();
        stored(&mut st, Tracked::PwdChangedTime, "20200101000000Z");
        added(&mut st, Tracked::UserPassword, "secret");

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowLastChange].value_after(), TODAY);
    }

    #[test]
    fn stored_password_uses_changed_time() {
        let mut st = state();
        stored(&mut st, Tracked::UserPassword, "secret");
        // 2020-01-01 is day 18262
        stored(&mut st, Tracked::PwdChangedTime, "20200101000000Z");

        run_rules(&mut st, true, TODAY);
        let slot = st[Tracked::PwdShadowLastChange];
        assert_eq!(slot.outcome(), Outcome::MustAdd { overridden: false });
        assert_eq!(slot.value_after(), 18_262);
    }

    #[test]
    fn stored_password_without_changed_time_uses_today() {
        let mut st = state();
        stored(&mut st, Tracked::UserPassword, "secret");

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowLastChange].value_after(), TODAY);
    }

    #[test]
    fn end_time_wins_over_auto_expire() {
        let mut st = state();
        st.auto_expire = true;
        stored(&mut st, Tracked::UserPassword, "secret");
        stored(&mut st, Tracked::PwdShadowLastChange, "18000");
        stored(&mut st, Tracked::PwdMaxAge, &(90 * DAY).to_string());
        added(&mut st, Tracked::PwdEndTime, "20200101000000Z");

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowExpire].value_after(), 18_262);
        assert!(st[Tracked::PwdShadowExpire].must_add());
    }

    #[test]
    fn auto_expire_sums_last_change_max_and_inactive() {
        let mut st = state();
        st.auto_expire = true;
        stored(&mut st, Tracked::UserPassword, "secret");
        stored(&mut st, Tracked::PwdShadowLastChange, "18000");
        stored(&mut st, Tracked::PwdMaxAge, &(90 * DAY).to_string());
        stored(&mut st, Tracked::PwdGraceExpiry, &(5 * DAY).to_string());

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowMax].value_after(), 90);
        assert_eq!(st[Tracked::PwdShadowInactive].value_after(), 5);
        assert_eq!(st[Tracked::PwdShadowExpire].value_after(), 18_095);
    }

    #[test]
    fn expiration_without_inputs_is_not_written() {
        let mut st = state();
        stored(&mut st, Tracked::PwdMaxAge, &(90 * DAY).to_string());

        run_rules(&mut st, true, TODAY);
        assert_eq!(st[Tracked::PwdShadowExpire].outcome(), Outcome::Unchanged);
        assert!(st[Tracked::PwdShadowMax].must_add());
    }

    #[test]
    fn expiration_without_inputs_retracts_stored_value() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowExpire, "18090");
        added(&mut st, Tracked::PwdShadowLastChange, "18100");

        precheck(&mut st, rule(Tracked::PwdShadowExpire), true);
        assert!(st[Tracked::PwdShadowExpire].must_add());
        synthesize_expiration(&mut st, Tracked::PwdShadowExpire);
        assert_eq!(st[Tracked::PwdShadowExpire].outcome(), Outcome::MustDelete);
    }

    #[test]
    fn source_gate() {
        let mut st = state();
        stored(&mut st, Tracked::PwdShadowGenerate, "TRUE");
        stored(&mut st, Tracked::PwdChangedTime, "20200101000000Z");
        assert!(!touches_sources(&st));

        added(&mut st, Tracked::ShadowFlag, "0");
        assert!(touches_sources(&st));
    }
}
