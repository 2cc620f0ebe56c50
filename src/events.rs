use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events emitted while an order is being edited.
///
/// Consumers subscribe through the channel created by
/// [`create_event_channel`]; the session never blocks on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Item lifecycle
    ItemAdded {
        entry_id: Uuid,
        sequence: u32,
        product_code: String,
    },
    ItemUpdated {
        entry_id: Uuid,
        product_code: String,
    },
    ItemRemoved {
        entry_id: Uuid,
        product_code: String,
    },
    ItemsReplaced {
        operation: String,
        count: usize,
    },
    DuplicateRejected {
        product_code: String,
        reference_code: String,
    },
    StagedItemsMerged {
        count: usize,
    },

    // Totals and persistence
    TotalsChanged {
        gross_total: Decimal,
        net_total: Decimal,
        net_with_tax_total: Decimal,
    },
    HeaderSaved {
        order_number: i64,
    },
    ItemsSynced {
        order_number: i64,
        count: usize,
    },
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

    /// Sends an event, logging instead of failing when no receiver is left.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Failed to publish event: {}", e);
        }
    }
}

/// Creates the event channel with the given buffer capacity.
pub fn create_event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

// Drains incoming events and logs them. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemAdded {
                entry_id,
                sequence,
                ref product_code,
            } => {
                info!(%entry_id, sequence, product_code, "Item added to order");
            }
            Event::ItemUpdated {
                entry_id,
                ref product_code,
            } => {
                info!(%entry_id, product_code, "Item updated");
            }
            Event::ItemRemoved {
                entry_id,
                ref product_code,
            } => {
                info!(%entry_id, product_code, "Item removed from order");
            }
            Event::ItemsReplaced {
                ref operation,
                count,
            } => {
                info!(operation, count, "Batch update replaced order items");
            }
            Event::DuplicateRejected {
                ref product_code,
                ref reference_code,
            } => {
                warn!(product_code, reference_code, "Duplicate item rejected");
            }
            Event::StagedItemsMerged { count } => {
                info!(count, "Staged items merged into order");
            }
            Event::TotalsChanged {
                gross_total,
                net_total,
                net_with_tax_total,
            } => {
                info!(
                    %gross_total,
                    %net_total,
                    %net_with_tax_total,
                    "Order totals changed"
                );
            }
            Event::HeaderSaved { order_number } => {
                info!(order_number, "Order header saved");
            }
            Event::ItemsSynced {
                order_number,
                count,
            } => {
                info!(order_number, count, "Order items synced");
            }
        }
    }

    info!("Event processing loop stopped");
}
