//! # pwdshadow-engine
//!
//! Derives the read-only shadow account-aging attributes (`pwdShadow*`)
//! of a directory record from its password policy and its own RFC 2307
//! `shadow*` override attributes.
//!
//! - [`ShadowEngine::on_create`] writes derived values into a new record
//! - [`ShadowEngine::on_update`] appends modifications to a pending modify
//! - Derivation rules run in a fixed order; see [`rules`]
//! - Per-attribute conversion failures are logged and skipped

#![deny(unsafe_code)]

pub mod config;
pub mod emitter;
pub mod errors;
pub mod eval;
pub mod orchestrator;
pub mod policy;
pub mod rules;
pub mod slot;
pub mod state;

pub use config::EngineConfig;
pub use emitter::{Change, Report};
pub use errors::{EngineError, Result, SlotError, StoreError};
pub use orchestrator::ShadowEngine;
pub use policy::{EntryStore, MemoryDirectory, PolicyResolver};
pub use slot::{Origin, Outcome, Pending, Slot};
pub use state::{Bindings, RequestState, Tracked};

use pwdshadow_core::logging::{init_json_subscriber, init_subscriber};
use pwdshadow_settings::{LogFormat, LoggingSettings};

/// Install the global subscriber described by `settings`.
pub fn init_logging(settings: &LoggingSettings) {
    match settings.format {
        LogFormat::Compact => init_subscriber(&settings.level),
        LogFormat::Json => init_json_subscriber(&settings.level),
    }
}
