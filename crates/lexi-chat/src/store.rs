//! Append-only conversation transcript.

use chrono::Utc;
use tokio::sync::broadcast;

use lexi_core::events::ConversationEvent;
use lexi_core::types::Exchange;

/// Ordered sequence of exchanges for one session.
///
/// Insertion order is chronological order. There is no way to edit or
/// remove an exchange once appended.
#[derive(Debug, Default)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
    events: Option<broadcast::Sender<ConversationEvent>>,
}

impl Conversation {
    /// An empty conversation that publishes no events.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty conversation that announces every append on `events`.
    pub fn with_events(events: broadcast::Sender<ConversationEvent>) -> Self {
        Self {
            exchanges: Vec::new(),
            events: Some(events),
        }
    }

    /// Add an exchange at the end and notify the view.
    pub fn append(&mut self, exchange: Exchange) {
        let index = self.exchanges.len();
        let exchange_id = exchange.id;
        tracing::debug!(index, %exchange_id, "Exchange appended");
        self.exchanges.push(exchange);

        if let Some(tx) = &self.events {
            // No subscribers is fine; the view may not be attached.
            let _ = tx.send(ConversationEvent::ExchangeAppended {
                exchange_id,
                index,
                timestamp: Utc::now(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Owned copy of the transcript, for rendering outside the lock.
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.exchanges.clone()
    }
}
