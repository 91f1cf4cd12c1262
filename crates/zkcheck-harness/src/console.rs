//! Console log aggregation
//!
//! The page's console stream has exactly one writer, the engine's event
//! callback, and any number of readers. Readers only ever get an owned
//! snapshot, so nothing observes the buffer mid-append. Once sealed the
//! buffer drops late messages, which keeps the final snapshot final.

use chrono::Utc;
use std::sync::RwLock;
use tracing::trace;
use zkcheck_browser::ConsoleSink;
use zkcheck_core::{LogEvent, Severity};

#[derive(Debug, Default)]
struct Inner {
    events: Vec<LogEvent>,
    sealed: bool,
}

/// Append-only buffer of console events for one session
#[derive(Debug, Default)]
pub struct LogBuffer {
    inner: RwLock<Inner>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning the next sequence number
    ///
    /// Returns `None` once the buffer is sealed.
    pub fn append(&self, severity: Severity, text: impl Into<String>) -> Option<u64> {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if inner.sealed {
            return None;
        }

        let sequence = inner.events.len() as u64;
        let text = text.into();
        trace!("console #{} [{}] {}", sequence, severity, text);
        inner.events.push(LogEvent {
            sequence,
            severity,
            text,
            timestamp: Utc::now(),
        });
        Some(sequence)
    }

    /// Snapshot of every event so far; does not consume anything
    pub fn drain(&self) -> Vec<LogEvent> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .events
            .clone()
    }

    /// Stop accepting events and return the final snapshot
    pub fn seal(&self) -> Vec<LogEvent> {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.sealed = true;
        inner.events.clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).sealed
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConsoleSink for LogBuffer {
    fn on_console(&self, severity: Severity, text: String) {
        self.append(severity, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_assigns_increasing_sequence() {
        let buffer = LogBuffer::new();
        assert_eq!(buffer.append(Severity::Log, "one"), Some(0));
        assert_eq!(buffer.append(Severity::Warn, "two"), Some(1));
        assert_eq!(buffer.append(Severity::Error, "three"), Some(2));

        let events = buffer.drain();
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(events[1].severity, Severity::Warn);
        assert_eq!(events[1].to_string(), "[warn] two");
    }

    #[test]
    fn test_drain_is_idempotent() {
        let buffer = LogBuffer::new();
        buffer.append(Severity::Info, "Generating deposit address");
        buffer.append(Severity::Log, "Poseidon note created");

        let first = buffer.drain();
        let second = buffer.drain();
        assert_eq!(first, second);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_appends() {
        let buffer = LogBuffer::new();
        buffer.append(Severity::Log, "before");
        let snapshot = buffer.drain();

        buffer.append(Severity::Log, "after");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.drain().len(), 2);
    }

    #[test]
    fn test_sealed_buffer_drops_late_events() {
        let buffer = LogBuffer::new();
        buffer.append(Severity::Log, "in time");
        let sealed = buffer.seal();

        assert!(buffer.is_sealed());
        assert_eq!(buffer.append(Severity::Log, "too late"), None);
        assert_eq!(sealed, buffer.drain());
        assert_eq!(sealed.len(), 1);
    }

    #[test]
    fn test_concurrent_writer_keeps_sequence_strict() {
        let buffer = Arc::new(LogBuffer::new());
        let writer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    buffer.on_console(Severity::Log, format!("event {}", i));
                }
            })
        };

        for _ in 0..50 {
            let snapshot = buffer.drain();
            assert!(snapshot.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));
        }
        writer.join().unwrap();

        let events = buffer.drain();
        assert_eq!(events.len(), 200);
        assert_eq!(events.last().map(|e| e.sequence), Some(199));
    }
}
