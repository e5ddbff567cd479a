//! Checkout orchestration: price the cart, open a gateway transaction,
//! persist the pending order, then confirm payment and run the side
//! effects exactly once.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::entities::order::{self, Entity as Order, OrderStatus};
use crate::entities::order_item::{self, Entity as OrderItem};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::carts::CartService;
use crate::services::coupons::CouponService;
use crate::services::payments::PaymentGateway;
use crate::services::pricing;

pub const ORDER_CURRENCY: &str = "INR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderInput {
    pub coupon_code: Option<String>,
}

/// Everything the browser needs to launch the gateway's checkout widget.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub gateway_key_id: String,
    pub gateway_order_id: String,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub user_name: String,
    pub user_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentInput {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub status: OrderStatus,
    pub order_id: Uuid,
}

/// Order with its snapshot lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    carts: CartService,
    coupons: CouponService,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        carts: CartService,
        coupons: CouponService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            event_sender,
            carts,
            coupons,
            gateway,
        }
    }

    /// Price the user's cart, open a gateway transaction and persist the
    /// order as `pending`.
    ///
    /// A coupon that fails validation here does not abort checkout: the
    /// order proceeds with zero discount, matching what the user would get
    /// by clearing the coupon field. Database and gateway failures still
    /// abort.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_order(
        &self,
        user: &AuthenticatedUser,
        input: CreateOrderInput,
    ) -> Result<CreateOrderResponse, ServiceError> {
        let cart = self.carts.get_or_create_cart(user.id).await?;
        let items = self.carts.items(cart.id).await?;
        if items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let subtotal = pricing::subtotal(items.iter().map(|i| (&i.price, i.quantity)));

        let mut discount = Decimal::ZERO;
        let mut coupon_code = None;
        if let Some(code) = input.coupon_code {
            match self.coupons.validate_coupon(&code, subtotal).await {
                Ok(coupon) => {
                    discount = pricing::discount_for(&coupon, subtotal);
                    coupon_code = Some(coupon.code);
                }
                Err(ServiceError::Coupon(err)) => {
                    warn!(%code, %err, "invalid coupon at order creation, pricing without it");
                }
                Err(other) => return Err(other),
            }
        }

        let quote = pricing::price(subtotal, discount).round_dp2();

        let receipt = format!("order_rcpt_{}_{}", user.id, Utc::now().timestamp_millis());
        let gateway_order_id = self
            .gateway
            .create_gateway_order(quote.amount_minor(), ORDER_CURRENCY, &receipt)
            .await
            .map_err(|e| ServiceError::PaymentGateway(e.to_string()))?;

        let order_id = Uuid::new_v4();
        let txn = self.db.begin().await?;
        let model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user.id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(quote.subtotal),
            discount: Set(quote.discount),
            shipping: Set(quote.shipping),
            tax: Set(quote.tax),
            total: Set(quote.total),
            currency: Set(ORDER_CURRENCY.to_string()),
            gateway_order_id: Set(gateway_order_id.clone()),
            gateway_payment_id: Set(None),
            gateway_signature: Set(None),
            coupon_code: Set(coupon_code),
            customer_name: Set(user.name.clone()),
            customer_email: Set(user.email.clone()),
            created_at: Set(Utc::now()),
        };
        model.insert(&txn).await?;

        for (position, item) in items.iter().enumerate() {
            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name.clone()),
                price: Set(item.price),
                image: Set(item.image.clone()),
                category: Set(item.category.clone()),
                size: Set(item.size.clone()),
                color: Set(item.color.clone()),
                quantity: Set(item.quantity),
                position: Set(position as i32),
            };
            line.insert(&txn).await?;
        }
        txn.commit().await?;

        info!(%order_id, %gateway_order_id, total = %quote.total, "pending order created");
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                gateway_order_id: gateway_order_id.clone(),
            })
            .await;

        Ok(CreateOrderResponse {
            gateway_key_id: self.gateway.key_id().to_string(),
            gateway_order_id,
            order_id,
            amount: quote.total,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
        })
    }

    /// Confirm a payment. Fail-closed: the signature is checked against the
    /// gateway order id stored on the order, never the one the client sent,
    /// and only a `pending` order transitions to `paid`. Side effects (cart
    /// clear, coupon redemption) run exactly once; a replayed confirmation
    /// of an already-paid order succeeds without repeating them.
    #[instrument(skip(self, user, input), fields(user_id = %user.id, order_id = %input.order_id))]
    pub async fn verify_payment(
        &self,
        user: &AuthenticatedUser,
        input: VerifyPaymentInput,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        let order = Order::find_by_id(input.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".into()))?;

        let verified = self.gateway.verify_payment_signature(
            &order.gateway_order_id,
            &input.gateway_payment_id,
            &input.gateway_signature,
        );
        if !verified {
            warn!("payment signature rejected");
            return Err(ServiceError::PaymentVerificationFailed);
        }

        let transition = Order::update_many()
            .set(order::ActiveModel {
                status: Set(OrderStatus::Paid),
                gateway_payment_id: Set(Some(input.gateway_payment_id.clone())),
                gateway_signature: Set(Some(input.gateway_signature.clone())),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .exec(&*self.db)
            .await?;

        if transition.rows_affected == 0 {
            // already paid: a replay confirms without re-running side effects
            info!("payment confirmation replayed for paid order");
            return Ok(VerifyPaymentResponse {
                status: OrderStatus::Paid,
                order_id: order.id,
            });
        }

        // the order is paid; a failed cart clear must not undo that
        if let Err(err) = self.carts.clear(user.id).await {
            warn!(%err, "cart clear after payment failed");
        }
        if let Some(code) = &order.coupon_code {
            self.coupons.redeem(code).await?;
        }

        info!("payment confirmed");
        self.event_sender
            .send_or_log(Event::PaymentConfirmed { order_id: order.id })
            .await;

        Ok(VerifyPaymentResponse {
            status: OrderStatus::Paid,
            order_id: order.id,
        })
    }

    /// Order with its lines, for the confirmation page.
    pub async fn get_order(&self, id: Uuid) -> Result<OrderView, ServiceError> {
        let order = Order::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".into()))?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::Position)
            .all(&*self.db)
            .await?;
        Ok(OrderView { order, items })
    }
}
