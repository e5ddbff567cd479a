//! Lightweight in-process event bus. Services publish domain events over an
//! mpsc channel; a background task logs them and fans out any side-channel
//! work that must not block request handling.

use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use serde::{Deserialize, Serialize};

/// Domain events emitted by the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserLoggedIn { user_id: Uuid, email: String },
    UserPromotedToAdmin { user_id: Uuid },
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    CouponCreated { coupon_id: Uuid, code: String },
    CouponUpdated(Uuid),
    CouponDeleted(Uuid),
    CouponRedeemed { code: String },
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemUpdated { cart_id: Uuid, item_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared { cart_id: Uuid },
    OrderCreated { order_id: Uuid, gateway_order_id: String },
    PaymentConfirmed { order_id: Uuid },
    HeroContentUpdated,
    FileUploaded { url: String },
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

    /// Publish without surfacing channel failures to the caller. Events are
    /// advisory; a full or closed channel must never fail the request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event channel unavailable: {}", e);
        }
    }
}

/// Drain the event channel. Currently events are only logged, but this is
/// where order-confirmation email or analytics hooks would attach.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                gateway_order_id,
            } => {
                info!(%order_id, %gateway_order_id, "order created, awaiting payment");
            }
            Event::PaymentConfirmed { order_id } => {
                info!(%order_id, "payment confirmed");
            }
            Event::CouponRedeemed { code } => {
                info!(%code, "coupon redeemed");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed, stopping event processing loop");
}
