//! # Statsync Core
//!
//! Stat value model and per-user stat document for statsync.
//!
//! This crate provides:
//! - Named stat values (numeric or string) with dirty markers
//! - The stat value document: an insertion-ordered write-back cache
//! - Document freshness state machine (not loaded → loaded → offline)
//! - Remote merge that never discards local writes
//! - The wire/offline payload representation
//!
//! ## Key Invariants
//!
//! - A stat name is unique within a document
//! - Merging a remote snapshot never overwrites a locally-present stat
//! - No state transition discards unsynced local writes
//! - Dirtiness is cleared only by the caller, after a confirmed sync

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod value;

pub use document::{DocumentState, FlushTrigger, StatDocument};
pub use error::{DocumentError, DocumentResult};
pub use value::{DocumentPayload, StatData, StatValue, WireStat};
