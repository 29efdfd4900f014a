use crate::models::{BomItemType, QuoteStatus, SalesOrderStatus, UpsertOutcome};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

/// Things that happened inside the engine, published after the write that caused them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Quote events
    QuoteCreated {
        quote_id: Uuid,
        quote_number: String,
        customer_id: Uuid,
    },
    QuoteRepriced {
        quote_id: Uuid,
        total_amount: Decimal,
    },
    QuoteStatusChanged {
        quote_id: Uuid,
        old_status: QuoteStatus,
        new_status: QuoteStatus,
    },

    // Sales order events
    SalesOrderCreated {
        sales_order_id: Uuid,
        sales_order_number: String,
        quote_id: Uuid,
        total_amount: Decimal,
    },
    SalesOrderStatusChanged {
        sales_order_id: Uuid,
        old_status: SalesOrderStatus,
        new_status: SalesOrderStatus,
    },
    SalesOrderShippingUpdated {
        sales_order_id: Uuid,
        tracking_number: Option<String>,
    },

    // Catalog events
    BomLineUpserted {
        machine_id: Uuid,
        line_id: Uuid,
        item_type: BomItemType,
        item_id: Uuid,
        merged: bool,
    },
    BomLineRemoved {
        machine_id: Uuid,
        line_id: Uuid,
    },
    SubAssemblySaved {
        sub_assembly_id: Uuid,
        total_cost: Decimal,
    },
}

impl Event {
    pub fn bom_line_upserted(
        machine_id: Uuid,
        line_id: Uuid,
        item_type: BomItemType,
        item_id: Uuid,
        outcome: UpsertOutcome,
    ) -> Self {
        Event::BomLineUpserted {
            machine_id,
            line_id,
            item_type,
            item_id,
            merged: outcome == UpsertOutcome::Merged,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort send that never waits. A full or closed channel drops the event with a warning.
    pub fn send_or_log(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!("Event channel full, dropping {:?}", event),
            Err(TrySendError::Closed(event)) => warn!("Event channel closed, dropping {:?}", event),
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_the_receiver() {
        let (sender, mut rx) = channel(4);
        let quote_id = Uuid::new_v4();
        sender.send_or_log(Event::QuoteStatusChanged {
            quote_id,
            old_status: QuoteStatus::Draft,
            new_status: QuoteStatus::Sent,
        });

        assert_eq!(
            rx.recv().await,
            Some(Event::QuoteStatusChanged {
                quote_id,
                old_status: QuoteStatus::Draft,
                new_status: QuoteStatus::Sent,
            })
        );
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_waiting() {
        let (sender, mut rx) = channel(1);
        let first = Event::BomLineRemoved {
            machine_id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
        };
        sender.send_or_log(first.clone());
        sender.send_or_log(Event::BomLineRemoved {
            machine_id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
        });

        assert_eq!(rx.try_recv().ok(), Some(first));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_channel_does_not_fail_caller() {
        let (sender, rx) = channel(1);
        drop(rx);
        sender.send_or_log(Event::BomLineRemoved {
            machine_id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
        });
        assert!(sender.send(Event::BomLineRemoved {
            machine_id: Uuid::new_v4(),
            line_id: Uuid::new_v4(),
        })
        .await
        .is_err());
    }
}
