//! # Statsync Engine
//!
//! Debounced write-back sync engine for per-user stat documents.
//!
//! This crate provides:
//! - The stats manager: multi-user registry, event queue, public surface
//! - Debounced flush scheduling (normal and high priority windows)
//! - A background sweep that flushes dirty documents opportunistically
//! - Remote service and offline log abstractions with test doubles
//!
//! ## Architecture
//!
//! The host calls the manager synchronously (`add_local_user`,
//! `set_stat_*`, `get_stat`, `request_flush_to_service`); the manager
//! mutates the relevant document under a single lock and launches
//! network-touching work as spawned tasks. A host-driven `do_work()`
//! call drains queued events and advances local bookkeeping; the engine
//! never delivers callbacks to the host on its own.
//!
//! ## Key Invariants
//!
//! - One coarse lock serializes the registry, the event queue, and every
//!   document mutation; network awaits happen strictly outside it
//! - Completions hold a weak manager reference: a dropped manager or a
//!   removed user turns an in-flight completion into a silent no-op
//! - Service failures are never surfaced synchronously; every async
//!   outcome is reported as a queued [`StatEvent`]
//! - Connectivity-class push failures transition the document offline and
//!   route the payload to the durable offline log

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod manager;
mod offline;
mod scheduler;
mod service;
mod user;

pub use config::ManagerConfig;
pub use error::{StatsError, StatsResult};
pub use event::{StatEvent, StatEventKind};
pub use manager::StatsManager;
pub use offline::{MemoryOfflineWriter, NoopOfflineWriter, OfflineWriter};
pub use scheduler::{BatchCallback, FlushScheduler};
pub use service::{MockStatsService, StatsService};
pub use user::LocalUser;

pub use statsync_core::{
    DocumentPayload, DocumentState, StatData, StatValue, WireStat,
};
