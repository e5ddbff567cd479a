//! Product catalog CRUD.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub image: String,
    pub colors: Option<Vec<String>>,
    pub badge: Option<String>,
    pub model_3d_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub colors: Option<Vec<String>>,
    pub badge: Option<String>,
    pub model_3d_url: Option<String>,
}

impl UpdateProductInput {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.original_price.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.colors.is_none()
            && self.badge.is_none()
            && self.model_3d_url.is_none()
    }
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            category: Set(input.category),
            price: Set(input.price),
            original_price: Set(input.original_price),
            description: Set(input.description),
            image: Set(input.image),
            colors: Set(input.colors.map(serde_json::Value::from)),
            badge: Set(input.badge),
            model_3d_url: Set(input.model_3d_url),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        Ok(created)
    }

    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find().all(&*self.db).await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with id {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if input.is_empty() {
            return Err(ServiceError::ValidationError(
                "No update data provided".into(),
            ));
        }

        let existing = self.get_product(id).await?;
        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(category) = input.category {
            model.category = Set(category);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(original_price) = input.original_price {
            model.original_price = Set(Some(original_price));
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(image) = input.image {
            model.image = Set(image);
        }
        if let Some(colors) = input.colors {
            model.colors = Set(Some(serde_json::Value::from(colors)));
        }
        if let Some(badge) = input.badge {
            model.badge = Set(Some(badge));
        }
        if let Some(url) = input.model_3d_url {
            model.model_3d_url = Set(Some(url));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product with id {} not found",
                id
            )));
        }
        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        Ok(())
    }
}
