//! In-process domain events.
//!
//! Handlers publish events without waiting for them; a single worker task
//! applies their follow-up effects. Publishing never blocks a request: if
//! the channel is full the event is dropped and a warning is logged.

use std::sync::Arc;

use chrono::Utc;
use reservio_core::types::{BookingId, BusinessId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::db::Database;

/// Capacity of the event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something that happened which other parts of the system react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    /// A booking moved into `completed`.
    BookingCompleted {
        business_id: BusinessId,
        booking_id: BookingId,
    },
}

/// Publishing side of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus and the receiver its worker consumes.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Publish without waiting. Drops the event if the worker is behind.
    pub fn publish(&self, event: DomainEvent) {
        if let Err(err) = self.tx.try_send(event) {
            warn!(?event, error = %err, "Dropping domain event");
        }
    }
}

/// Spawn the worker that consumes events until every sender is dropped.
pub fn spawn_worker(db: Arc<Database>, mut rx: mpsc::Receiver<DomainEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handle(&db, event).await;
        }
        info!("Event worker stopped");
    })
}

#[instrument(skip(db))]
async fn handle(db: &Database, event: DomainEvent) {
    match event {
        DomainEvent::BookingCompleted {
            business_id,
            booking_id,
        } => request_review(db, business_id, booking_id).await,
    }
}

/// Stamp `review_requested_at` on a completed booking, once.
async fn request_review(db: &Database, business_id: BusinessId, booking_id: BookingId) {
    let mut tables = db.write().await;
    let booking = match tables
        .tenant_mut(business_id)
        .and_then(|tenant| tenant.bookings.find_mut(booking_id))
    {
        Ok(booking) => booking,
        Err(err) => {
            warn!(%booking_id, error = %err, "Completed booking vanished before review request");
            return;
        }
    };
    if booking.review_requested_at.is_some() {
        return;
    }
    booking.review_requested_at = Some(Utc::now());
    info!(
        %booking_id,
        customer = %booking.customer.name,
        "Review requested from customer"
    );
}
