use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the workflow and ledger services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderItemAdded {
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    StockReserved {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockReleased {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockCommitted {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockCommitReversed {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockReceived {
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a connected sender/receiver pair with the given buffer depth.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Runs until every sender
/// is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, from = %old_status, to = %new_status, "order status changed");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }
    warn!("event channel closed; processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_round_trip() {
        let (sender, mut rx) = channel(4);
        sender
            .send(Event::OrderCreated(Uuid::nil()))
            .await
            .expect("send should succeed");
        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, Uuid::nil()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_drops() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender.send(Event::OrderCreated(Uuid::nil())).await.is_err());
    }
}
