//! # pwdshadow-core
//!
//! Foundation types shared by the pwdshadow crates.
//!
//! - **Attributes**: the catalog of directory attribute types the engine
//!   tracks, their syntaxes, and the process-wide identity table
//! - **Conversion**: typed parsing of raw attribute values into day counts
//!   and booleans
//! - **Entries**: in-memory directory records and modification descriptors
//! - **Clock**: injectable time source for "today" in day-count units
//! - **Errors**: `thiserror` hierarchy for lookup and conversion failures
//! - **Logging**: `tracing` subscriber setup and a capture layer for tests

#![deny(unsafe_code)]

pub mod attributes;
pub mod clock;
pub mod convert;
pub mod entry;
pub mod errors;
pub mod logging;

pub use attributes::{
    AttributeId, AttributeRegistry, AttributeType, Syntax, init_registry, registry,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use convert::{SECONDS_PER_DAY, ValueKind, convert};
pub use entry::{Attribute, Entry, ModOp, Modification};
pub use errors::{ConvertError, CoreError, Result};
