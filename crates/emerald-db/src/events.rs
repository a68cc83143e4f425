//! # Engine Events
//!
//! Post-commit notifications for interested subscribers (receipt
//! printers, dashboards, a sync layer). Events fire after the sale's
//! unit of work commits and are strictly best-effort: a sale is
//! complete whether or not anyone hears about it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// A notification emitted after a committed unit of work.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    /// A sale committed.
    #[serde(rename = "sale.completed")]
    SaleCompleted {
        transaction_id: String,
        transaction_number: String,
        total_cents: i64,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A product's on-hand quantity changed (sale, refund, void).
    #[serde(rename = "inventory.updated")]
    InventoryUpdated {
        product_id: String,
        quantity: i64,
        timestamp: DateTime<Utc>,
    },
}

/// Sink for engine events. Implementations must not block and must not
/// fail the caller; delivery is best-effort by contract.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Sink that drops every event. Default for embedded/test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: EngineEvent) {}
}

/// Fan-out sink backed by a tokio broadcast channel. Subscribers that
/// lag past the channel capacity lose oldest events first, which is
/// acceptable for notifications.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<EngineEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        BroadcastEventSink { sender }
    }

    /// Subscribes to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: EngineEvent) {
        // Err just means no subscribers right now
        if self.sender.send(event).is_err() {
            debug!("Engine event dropped: no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscriber() {
        let sink = BroadcastEventSink::new(16);
        let mut rx = sink.subscribe();

        sink.publish(EngineEvent::InventoryUpdated {
            product_id: "p1".into(),
            quantity: 7,
            timestamp: Utc::now(),
        });

        match rx.try_recv().unwrap() {
            EngineEvent::InventoryUpdated { product_id, quantity, .. } => {
                assert_eq!(product_id, "p1");
                assert_eq!(quantity, 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let sink = BroadcastEventSink::new(4);
        sink.publish(EngineEvent::InventoryUpdated {
            product_id: "p1".into(),
            quantity: 0,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_wire_format() {
        let event = EngineEvent::SaleCompleted {
            transaction_id: "t1".into(),
            transaction_number: "TXN-20240120-0001".into(),
            total_cents: 10395,
            user_id: "op-1".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "sale.completed");
        assert_eq!(json["total_cents"], 10395);
    }
}
