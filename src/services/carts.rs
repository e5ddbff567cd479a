//! Per-user shopping carts. Carts are created lazily; lines merge by
//! `(product, size, color)` and keep their insertion order for checkout.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::cart::{self, Entity as Cart};
use crate::entities::cart_item::{self, Entity as CartItem};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCartItemInput {
    pub product_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    pub size: String,
    pub color: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCartItemInput {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Cart plus its lines, as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<cart_item::Model>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetch the user's cart, creating an empty one on first access.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    /// Cart lines in insertion order.
    pub async fn items(&self, cart_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::Position)
            .all(&*self.db)
            .await?)
    }

    pub async fn view(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;
        let items = self.items(cart.id).await?;
        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items,
            updated_at: cart.updated_at,
        })
    }

    /// Add a line, merging with an existing one when product, size and
    /// color all match. The merge is a single conditional UPDATE so two
    /// concurrent adds never produce duplicate lines for the same entry.
    #[instrument(skip(self, input))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddCartItemInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;
        let cart = self.get_or_create_cart(user_id).await?;

        let merged = CartItem::update_many()
            .col_expr(
                cart_item::Column::Quantity,
                Expr::col(cart_item::Column::Quantity).add(input.quantity),
            )
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(cart_item::Column::Size.eq(input.size.clone()))
            .filter(cart_item::Column::Color.eq(input.color.clone()))
            .exec(&*self.db)
            .await?;

        if merged.rows_affected == 0 {
            let position = self.next_position(cart.id).await?;
            let model = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(input.product_id),
                name: Set(input.name),
                price: Set(input.price),
                image: Set(input.image),
                category: Set(input.category),
                size: Set(input.size),
                color: Set(input.color),
                quantity: Set(input.quantity),
                position: Set(position),
                created_at: Set(Utc::now()),
            };
            model.insert(&*self.db).await?;
        }

        self.touch(cart.id).await?;
        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
            })
            .await;
        self.view(user_id).await
    }

    /// Replace a line's quantity. 404 when the line is not in this user's
    /// cart.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartView, ServiceError> {
        input.validate()?;
        let cart = self.get_or_create_cart(user_id).await?;

        let result = CartItem::update_many()
            .col_expr(cart_item::Column::Quantity, Expr::value(input.quantity))
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Item not found in cart".into()));
        }

        self.touch(cart.id).await?;
        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                item_id,
            })
            .await;
        self.view(user_id).await
    }

    /// Drop a line. Removing an id that is not present is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.touch(cart.id).await?;
        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;
        self.view(user_id).await
    }

    /// Empty the cart. Called after a confirmed payment.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;
        self.touch(cart.id).await?;
        self.event_sender
            .send_or_log(Event::CartCleared { cart_id: cart.id })
            .await;
        Ok(())
    }

    async fn next_position(&self, cart_id: Uuid) -> Result<i32, ServiceError> {
        let max = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .select_only()
            .column_as(cart_item::Column::Position.max(), "max_position")
            .into_tuple::<Option<i32>>()
            .one(&*self.db)
            .await?
            .flatten();
        Ok(max.unwrap_or(0) + 1)
    }

    async fn touch(&self, cart_id: Uuid) -> Result<(), ServiceError> {
        Cart::update_many()
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::Id.eq(cart_id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
