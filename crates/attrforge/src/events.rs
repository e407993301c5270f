//! Lifecycle events fired around store writes.

use crate::error::{Error, Result};
use crate::value::RawMap;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::BeforeCreate => "beforeCreate",
            EventKind::AfterCreate => "afterCreate",
            EventKind::BeforeUpdate => "beforeUpdate",
            EventKind::AfterUpdate => "afterUpdate",
            EventKind::BeforeDelete => "beforeDelete",
            EventKind::AfterDelete => "afterDelete",
        };
        f.write_str(name)
    }
}

/// A store write about to happen (`Before*`, carrying the extracted data) or
/// that happened (`After*`, carrying the persisted data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub data_type: String,
    pub data: RawMap,
}

impl Event {
    pub fn new(kind: EventKind, data_type: impl Into<String>, data: RawMap) -> Self {
        Self {
            kind,
            data_type: data_type.into(),
            data,
        }
    }
}

/// Receives lifecycle events. An error from a `Before*` event aborts the
/// write.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, event: &Event) -> Result<()>;
}

/// Dispatcher that records every event, for tests and auditing.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventDispatcher for EventLog {
    fn dispatch(&self, event: &Event) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| Error::Store("event log lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
