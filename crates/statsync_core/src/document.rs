//! The per-user stat value document.

use crate::error::{DocumentError, DocumentResult};
use crate::value::{DocumentPayload, StatData, StatValue, WireStat};
use std::fmt;

/// Freshness state of a stat document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// No fetch has been attempted yet.
    NotLoaded,
    /// A fetch is in flight.
    Loading,
    /// The document has seen the server's baseline.
    Loaded,
    /// The document had been loaded, then a push failed for a
    /// connectivity reason.
    OfflineLoaded,
    /// The initial fetch failed while the user was signed in; the
    /// document has never seen the server's baseline.
    OfflineNotLoaded,
}

impl DocumentState {
    /// Returns true if the document is usable for local flush bookkeeping.
    pub fn is_loaded(&self) -> bool {
        matches!(self, DocumentState::Loaded | DocumentState::OfflineLoaded)
    }

    /// Returns true if the document is in an offline fallback state.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            DocumentState::OfflineLoaded | DocumentState::OfflineNotLoaded
        )
    }
}

/// Callback invoked when local writes must be propagated to the service.
pub type FlushTrigger = Box<dyn Fn() + Send + Sync>;

/// The per-user local stat cache: an insertion-ordered mapping of stat
/// name to [`StatValue`], a dirty flag, a freshness state, and a
/// pluggable flush trigger.
///
/// Local writes only ever mutate memory; propagation to the service is
/// decoupled and driven by the owner through the flush trigger.
pub struct StatDocument {
    values: Vec<StatValue>,
    state: DocumentState,
    dirty: bool,
    flush: Option<FlushTrigger>,
}

impl fmt::Debug for StatDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatDocument")
            .field("values", &self.values)
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .field("flush", &self.flush.is_some())
            .finish()
    }
}

impl Default for StatDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl StatDocument {
    /// Creates an empty document in the [`DocumentState::NotLoaded`] state.
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            state: DocumentState::NotLoaded,
            dirty: false,
            flush: None,
        }
    }

    /// Builds a clean document from a fetched payload.
    pub fn from_payload(payload: &DocumentPayload, state: DocumentState) -> Self {
        let mut doc = Self::new();
        doc.merge(payload);
        doc.state = state;
        doc
    }

    /// The current freshness state.
    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Sets the freshness state.
    pub fn set_state(&mut self, state: DocumentState) {
        self.state = state;
    }

    /// Returns true if the document has local writes not yet confirmed
    /// synced to the remote service.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the document and per-value dirty markers.
    ///
    /// Only call this after a confirmed successful sync (or right before
    /// handing the document to a flush that will report its own outcome).
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
        for value in &mut self.values {
            value.clear_dirty();
        }
    }

    /// Registers the flush trigger invoked by [`StatDocument::do_work`].
    pub fn set_flush_trigger(&mut self, trigger: FlushTrigger) {
        self.flush = Some(trigger);
    }

    /// Detaches the flush trigger, if any.
    pub fn clear_flush_trigger(&mut self) {
        self.flush = None;
    }

    /// Writes a numeric stat. Purely local; marks the value and the
    /// document dirty.
    pub fn set_stat_number(&mut self, name: &str, value: f64) -> DocumentResult<()> {
        self.set_stat(name, StatData::Number(value))
    }

    /// Writes a string stat. Purely local; marks the value and the
    /// document dirty.
    pub fn set_stat_text(&mut self, name: &str, value: impl Into<String>) -> DocumentResult<()> {
        self.set_stat(name, StatData::Text(value.into()))
    }

    fn set_stat(&mut self, name: &str, data: StatData) -> DocumentResult<()> {
        if name.is_empty() {
            return Err(DocumentError::EmptyName);
        }

        match self.values.iter_mut().find(|v| v.name() == name) {
            Some(existing) => existing.overwrite(data),
            None => {
                let mut value = match data {
                    StatData::Number(n) => StatValue::number(name, n),
                    StatData::Text(s) => StatValue::text(name, s),
                };
                value.mark_dirty();
                self.values.push(value);
            }
        }

        self.dirty = true;
        Ok(())
    }

    /// Reads a stat by name. Purely local, no network.
    pub fn get_stat(&self, name: &str) -> DocumentResult<&StatValue> {
        self.values
            .iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| DocumentError::NotFound(name.to_string()))
    }

    /// All known stat names, in insertion order.
    pub fn stat_names(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name().to_string()).collect()
    }

    /// Merges a remote snapshot into the document.
    ///
    /// Stats present remotely but absent locally are inserted clean.
    /// Stats already present locally are never overwritten, regardless of
    /// local dirtiness: local writes are always more current than a
    /// snapshot fetched before or during those writes. Idempotent.
    pub fn merge(&mut self, remote: &DocumentPayload) {
        for (name, wire) in remote.iter() {
            if self.values.iter().any(|v| v.name() == name) {
                continue;
            }
            let value = match wire {
                WireStat::Number(n) => StatValue::number(name.clone(), *n),
                WireStat::Text(s) => StatValue::text(name.clone(), s.clone()),
            };
            self.values.push(value);
        }
    }

    /// Advances local-only bookkeeping: if the document is dirty, a flush
    /// trigger is registered, and the state is loaded, invokes the trigger
    /// exactly once. Does not clear dirtiness; the owner clears it after a
    /// confirmed success.
    pub fn do_work(&mut self) {
        if self.dirty && self.state.is_loaded() {
            if let Some(flush) = &self.flush {
                flush();
            }
        }
    }

    /// Produces the structured document representation used for the wire
    /// protocol and offline fallback storage.
    pub fn to_payload(&self) -> DocumentPayload {
        self.values
            .iter()
            .map(|v| (v.name().to_string(), WireStat::from(v.data())))
            .collect()
    }
}
