use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Sender half of the domain event channel.
///
/// Events are observational: ledger correctness never depends on delivery.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

/// Events emitted by the ledger core after a unit of work commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockEntryRecorded {
        movement_id: i64,
        product_id: i64,
        location_id: i64,
        quantity: i32,
        lot_id: Option<i64>,
    },
    StockExitRecorded {
        movement_id: i64,
        product_id: i64,
        location_id: i64,
        quantity: i32,
        lot_id: Option<i64>,
    },
    StockTransferred {
        movement_id: i64,
        product_id: i64,
        source_location_id: i64,
        dest_location_id: i64,
        quantity: i32,
        lot_id: Option<i64>,
    },

    LotCreated {
        lot_id: i64,
        product_id: i64,
        lot_number: String,
    },
    LotAdjusted {
        lot_id: i64,
        delta: i32,
        new_quantity: i32,
    },
    LotRelocated {
        lot_id: i64,
        location_id: i64,
    },
    LotRemoved {
        lot_id: i64,
    },

    AlertRaised {
        alert_id: i64,
        kind: String,
        product_id: i64,
    },
    AlertAcknowledged {
        alert_id: i64,
    },
}

/// Drain the event channel, logging each event as it arrives.
///
/// Downstream consumers (webhooks, mail, dashboards) would hang off this loop;
/// in-process callers usually just spawn it.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockEntryRecorded {
                movement_id,
                product_id,
                location_id,
                quantity,
                ..
            } => {
                info!(movement_id, product_id, location_id, quantity, "stock entry recorded");
            }
            Event::StockExitRecorded {
                movement_id,
                product_id,
                location_id,
                quantity,
                ..
            } => {
                info!(movement_id, product_id, location_id, quantity, "stock exit recorded");
            }
            Event::StockTransferred {
                movement_id,
                product_id,
                source_location_id,
                dest_location_id,
                quantity,
                ..
            } => {
                info!(
                    movement_id,
                    product_id, source_location_id, dest_location_id, quantity, "stock transferred"
                );
            }
            Event::AlertRaised {
                alert_id,
                kind,
                product_id,
            } => {
                info!(alert_id, kind = %kind, product_id, "alert raised");
            }
            other => {
                info!(event = ?other, "event received");
            }
        }
    }

    info!("event channel closed, stopping event processing loop");
}
