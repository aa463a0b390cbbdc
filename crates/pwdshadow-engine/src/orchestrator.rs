//! Create and update entry points.
//!
//! Both follow the same sequence: fresh request state, load the record
//! (and pending modifications), gate on source attributes, resolve the
//! policy unless purging, run the rules, then hand the outcomes to the
//! emitter.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use pwdshadow_core::{Clock, Entry, Modification, SystemClock, registry};
use pwdshadow_settings::ShadowSettings;

use crate::config::EngineConfig;
use crate::emitter::{self, Report};
use crate::errors::Result;
use crate::eval;
use crate::policy::{EntryStore, PolicyResolver};
use crate::slot::Origin;
use crate::state::{Bindings, Group, RequestState, Tracked};

/// Derives shadow attributes for record creates and updates.
///
/// Holds no per-request state; share it across threads by reference.
pub struct ShadowEngine {
    config: EngineConfig,
    bindings: Bindings,
    clock: Arc<dyn Clock>,
    store: Arc<dyn EntryStore>,
}

impl ShadowEngine {
    /// Engine reading policies from `store`, using the system clock.
    pub fn new(config: EngineConfig, store: Arc<dyn EntryStore>) -> Result<Self> {
        let bindings = Bindings::resolve(registry(), config.policy_attribute)?;
        debug!(
            overrides = config.overrides,
            use_policies = config.use_policies,
            auto_expire = config.auto_expire,
            policy_attribute = %config.policy_attribute,
            "ShadowEngine initialized"
        );
        Ok(Self {
            config,
            bindings,
            clock: Arc::new(SystemClock),
            store,
        })
    }

    /// Engine configured from `settings`.
    pub fn from_settings(settings: &ShadowSettings, store: Arc<dyn EntryStore>) -> Result<Self> {
        Self::new(EngineConfig::from_settings(settings)?, store)
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Attribute identities used by this engine.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Derive attributes for a record about to be created, writing them
    /// into `record`.
    #[instrument(name = "pwdshadow_create", skip_all, fields(dn = %record.dn()))]
    pub fn on_create(&self, record: &mut Entry) -> Report {
        let mut state = self.load(record, Origin::Incoming);

        if !self.evaluate(&mut state) {
            return Report::default();
        }

        let report = emitter::assign(&state, record);
        log_report(&state, &report);
        report
    }

    /// Derive attributes for a pending modify of `existing`, appending the
    /// resulting operations to `mods`.
    #[instrument(name = "pwdshadow_update", skip_all, fields(dn = %existing.dn()))]
    pub fn on_update(&self, existing: &Entry, mods: &mut Vec<Modification>) -> Report {
        let mut state = self.load(existing, Origin::Stored);

        for modification in mods.iter() {
            let Some(tracked) = self.bindings.lookup(modification.attribute) else {
                continue;
            };
            match (tracked, tracked.group()) {
                // maintained by the password policy module; the stored value is authoritative
                (Tracked::PwdChangedTime, _) | (_, Group::Policy) => continue,
                (_, Group::Override) if !self.config.overrides => continue,
                _ => {}
            }
            if !state.load_modification(tracked, modification) {
                continue;
            }
            if tracked == Tracked::PolicySubentry && self.config.use_policies {
                state.policy_dn = if state[tracked].user_added() {
                    modification.first_value().map(str::to_owned)
                } else {
                    None
                };
            }
        }

        if !self.evaluate(&mut state) {
            return Report::default();
        }

        let report = emitter::emit(&state, mods);
        log_report(&state, &report);
        report
    }

    fn load(&self, record: &Entry, origin: Origin) -> RequestState {
        let mut state = RequestState::new(&self.bindings, self.config.auto_expire);
        for tracked in Tracked::ALL {
            if tracked.group() != Group::Policy {
                state.load_record_value(record, tracked, origin);
            }
        }
        if self.config.use_policies {
            state.policy_dn = record
                .first_value(self.bindings.id(Tracked::PolicySubentry))
                .map(str::to_owned);
        }
        state
    }

    /// Returns `false` when the request touches no source attribute.
    fn evaluate(&self, state: &mut RequestState) -> bool {
        state.purge = state.generation_disabled();

        if !eval::touches_sources(state) {
            debug!("no source attribute modified, skipping");
            return false;
        }

        if !state.purge && self.config.use_policies {
            let resolver = PolicyResolver::new(self.store.as_ref(), self.config.default_policy.as_deref());
            let loaded = resolver.resolve(state);
            state.policy = loaded;
        }

        eval::run_rules(state, self.config.overrides, self.clock.today());
        true
    }
}

fn log_report(state: &RequestState, report: &Report) {
    info!(
        purge = state.purge,
        policy = state.policy.as_deref(),
        added = report.added(),
        replaced = report.replaced(),
        deleted = report.deleted(),
        "derived attributes evaluated"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
