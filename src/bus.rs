use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{TradeEvent, WalletProfile};

pub const TOPIC_EVENT: &str = "polymarket:event";
pub const TOPIC_FRESH_WALLET: &str = "polymarket:fresh_wallet_detected";

const DEFAULT_CAPACITY: usize = 1024;

/// In-process signals, one variant per topic.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "topic", content = "payload")]
pub enum BusEvent {
    /// An event passed the save-filter.
    #[serde(rename = "polymarket:event")]
    QualifyingEvent(TradeEvent),
    /// A refreshed wallet classified as fresh.
    #[serde(rename = "polymarket:fresh_wallet_detected")]
    FreshWalletDetected(WalletProfile),
}

impl BusEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            BusEvent::QualifyingEvent(_) => TOPIC_EVENT,
            BusEvent::FreshWalletDetected(_) => TOPIC_FRESH_WALLET,
        }
    }
}

/// Broadcast fan-out of [`BusEvent`]s. Publishing never waits on subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to all current subscribers; returns how many received it.
    pub fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!(topic, "No bus subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
