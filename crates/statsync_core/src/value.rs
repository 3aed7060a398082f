//! Named stat values and their wire representation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The payload of a single stat value.
#[derive(Debug, Clone, PartialEq)]
pub enum StatData {
    /// A numeric stat.
    Number(f64),
    /// A string stat.
    Text(String),
}

/// A single named stat value with a dirty marker.
///
/// The dirty marker records that the value has been written locally and
/// the write has not yet been confirmed synced to the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct StatValue {
    name: String,
    data: StatData,
    dirty: bool,
}

impl StatValue {
    /// Creates a numeric stat value.
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            data: StatData::Number(value),
            dirty: false,
        }
    }

    /// Creates a string stat value.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: StatData::Text(value.into()),
            dirty: false,
        }
    }

    /// The stat name, unique within a document.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current value.
    pub fn data(&self) -> &StatData {
        &self.data
    }

    /// Returns the numeric value, if this is a numeric stat.
    pub fn as_number(&self) -> Option<f64> {
        match &self.data {
            StatData::Number(n) => Some(*n),
            StatData::Text(_) => None,
        }
    }

    /// Returns the string value, if this is a string stat.
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            StatData::Text(s) => Some(s.as_str()),
            StatData::Number(_) => None,
        }
    }

    /// Returns true if the value has an unsynced local write.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn overwrite(&mut self, data: StatData) {
        self.data = data;
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Wire form of a single stat: `{"kind": "n" | "s", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum WireStat {
    /// A numeric stat (`"kind": "n"`).
    #[serde(rename = "n")]
    Number(f64),
    /// A string stat (`"kind": "s"`).
    #[serde(rename = "s")]
    Text(String),
}

impl From<&StatData> for WireStat {
    fn from(data: &StatData) -> Self {
        match data {
            StatData::Number(n) => WireStat::Number(*n),
            StatData::Text(s) => WireStat::Text(s.clone()),
        }
    }
}

impl From<WireStat> for StatData {
    fn from(wire: WireStat) -> Self {
        match wire {
            WireStat::Number(n) => StatData::Number(n),
            WireStat::Text(s) => StatData::Text(s),
        }
    }
}

/// The structured document representation used both for the wire protocol
/// and for offline fallback storage: a mapping of stat name to [`WireStat`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentPayload {
    stats: BTreeMap<String, WireStat>,
}

impl DocumentPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a numeric stat.
    pub fn insert_number(&mut self, name: impl Into<String>, value: f64) {
        self.stats.insert(name.into(), WireStat::Number(value));
    }

    /// Inserts a string stat.
    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.stats.insert(name.into(), WireStat::Text(value.into()));
    }

    /// Looks up a stat by name.
    pub fn get(&self, name: &str) -> Option<&WireStat> {
        self.stats.get(name)
    }

    /// Number of stats in the payload.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Returns true if the payload contains no stats.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Iterates over the stats.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WireStat)> {
        self.stats.iter()
    }
}

impl FromIterator<(String, WireStat)> for DocumentPayload {
    fn from_iter<I: IntoIterator<Item = (String, WireStat)>>(iter: I) -> Self {
        Self {
            stats: iter.into_iter().collect(),
        }
    }
}
