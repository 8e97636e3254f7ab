//! Event types for the CamPricer event system
//!
//! The pipeline emits discrete domain events instead of calling platform
//! affordances (alerts, haptics, review prompts) directly. Notification
//! surfaces subscribe to the bus and decide what, if anything, to do with
//! each event.

use crate::types::CameraRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// CamPricer event types
///
/// Events are broadcast via EventBus and can be serialized for relay to a
/// host UI. All pipeline-observable state changes go through this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PricerEvent {
    /// A recognition result was accepted and sunk into both stores
    RecordAdded {
        /// The accepted record
        record: CameraRecord,
        /// When the record was accepted
        timestamp: DateTime<Utc>,
    },

    /// One image (or one batch/search call) failed to produce a record
    UploadFailed {
        /// Source image reference, if the failure is image-scoped
        image: Option<String>,
        /// Human-readable failure description
        reason: String,
        /// When the failure occurred
        timestamp: DateTime<Utc>,
    },

    /// The session result list was cleared
    ResultsCleared {
        /// When the list was cleared
        timestamp: DateTime<Utc>,
    },

    /// An over-capacity history entry was silently dropped
    HistoryEvicted {
        /// Identifier of the evicted entry
        entry_id: String,
        /// When the eviction happened
        timestamp: DateTime<Utc>,
    },

    /// A history entry was removed by id
    HistoryRemoved {
        /// Identifier of the removed entry
        entry_id: String,
        /// When the removal happened
        timestamp: DateTime<Utc>,
    },

    /// The entire history was cleared
    HistoryCleared {
        /// When the history was cleared
        timestamp: DateTime<Utc>,
    },

    /// Exchange rates were refreshed
    RatesRefreshed {
        /// False when the static fallback table was used
        live: bool,
        /// When the refresh completed
        timestamp: DateTime<Utc>,
    },

    /// Enough upload runs completed that the host may prompt for a review
    ReviewPromptSuggested {
        /// Completed upload runs so far this session
        upload_runs: u32,
        /// When the threshold was crossed
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Backed by tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// # Examples
///
/// ```
/// use campricer_common::events::{EventBus, PricerEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(PricerEvent::HistoryCleared {
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PricerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PricerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` when at least one subscriber exists,
    /// `Err` otherwise. Emitting with no subscribers is not a fault; callers
    /// discard the result with `.ok()`.
    pub fn emit(
        &self,
        event: PricerEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<PricerEvent>> {
        self.tx.send(event)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(PricerEvent::HistoryCleared {
            timestamp: Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            PricerEvent::HistoryCleared { .. } => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_is_not_fatal() {
        let bus = EventBus::new(10);
        let result = bus.emit(PricerEvent::ResultsCleared {
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = PricerEvent::HistoryEvicted {
            entry_id: "123-abcd".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "HistoryEvicted");
        assert_eq!(json["entry_id"], "123-abcd");
    }
}
