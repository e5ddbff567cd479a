//! Coupon management and evaluation.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon::{self, CouponKind, Entity as Coupon};
use crate::errors::{CouponError, ServiceError};
use crate::events::{Event, EventSender};

/// Deserialize an optional expiry timestamp, accepting both RFC 3339 and
/// naive `YYYY-MM-DDTHH:MM:SS` strings. Naive timestamps are read as UTC.
pub(crate) mod flexible_expiry {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                    return Ok(Some(dt.with_timezone(&Utc)));
                }
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| Some(DateTime::from_naive_utc_and_offset(naive, Utc)))
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponInput {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_expiry::deserialize")]
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCouponInput {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    pub kind: Option<CouponKind>,
    pub value: Option<Decimal>,
    pub min_order: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_expiry::deserialize")]
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub description: Option<String>,
}

impl UpdateCouponInput {
    fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.kind.is_none()
            && self.value.is_none()
            && self.min_order.is_none()
            && self.max_discount.is_none()
            && self.expires_at.is_none()
            && self.usage_limit.is_none()
            && self.description.is_none()
    }
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        input.validate()?;
        let code = input.code.to_uppercase();

        let existing = Coupon::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::DuplicateCouponCode);
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            kind: Set(input.kind),
            value: Set(input.value),
            min_order: Set(input.min_order),
            max_discount: Set(input.max_discount),
            expires_at: Set(input.expires_at),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        info!(coupon_id = %created.id, %code, "coupon created");
        self.event_sender
            .send_or_log(Event::CouponCreated {
                coupon_id: created.id,
                code,
            })
            .await;
        Ok(created)
    }

    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        Ok(Coupon::find().all(&*self.db).await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        input.validate()?;
        if input.is_empty() {
            return Err(ServiceError::ValidationError(
                "No update data provided".into(),
            ));
        }

        let existing = Coupon::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon with id {} not found", id)))?;

        let mut model: coupon::ActiveModel = existing.into();
        if let Some(code) = input.code {
            let code = code.to_uppercase();
            let clash = Coupon::find()
                .filter(coupon::Column::Code.eq(code.clone()))
                .filter(coupon::Column::Id.ne(id))
                .one(&*self.db)
                .await?;
            if clash.is_some() {
                return Err(ServiceError::DuplicateCouponCode);
            }
            model.code = Set(code);
        }
        if let Some(kind) = input.kind {
            model.kind = Set(kind);
        }
        if let Some(value) = input.value {
            model.value = Set(value);
        }
        if let Some(min_order) = input.min_order {
            model.min_order = Set(Some(min_order));
        }
        if let Some(max_discount) = input.max_discount {
            model.max_discount = Set(Some(max_discount));
        }
        if let Some(expires_at) = input.expires_at {
            model.expires_at = Set(Some(expires_at));
        }
        if let Some(usage_limit) = input.usage_limit {
            model.usage_limit = Set(Some(usage_limit));
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CouponUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Coupon::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Coupon with id {} not found",
                id
            )));
        }
        self.event_sender
            .send_or_log(Event::CouponDeleted(id))
            .await;
        Ok(())
    }

    /// Validate `code` against `subtotal`. Codes are matched upper-cased.
    /// A limit or minimum of zero counts as "not set".
    #[instrument(skip(self))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<coupon::Model, ServiceError> {
        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(code.to_uppercase()))
            .one(&*self.db)
            .await?
            .ok_or(CouponError::UnknownCode)?;

        if let Some(expires_at) = found.expires_at {
            if expires_at < Utc::now() {
                return Err(CouponError::Expired.into());
            }
        }
        if let Some(limit) = found.usage_limit {
            if limit > 0 && found.used_count >= limit {
                return Err(CouponError::UsageLimitReached.into());
            }
        }
        if let Some(min_order) = found.min_order {
            if min_order > Decimal::ZERO && subtotal < min_order {
                return Err(CouponError::MinOrderNotMet(min_order).into());
            }
        }
        Ok(found)
    }

    /// Record one redemption. A single conditional UPDATE so concurrent
    /// confirmations cannot push `used_count` past `usage_limit`.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str) -> Result<(), ServiceError> {
        let under_limit = Condition::any()
            .add(coupon::Column::UsageLimit.is_null())
            .add(coupon::Column::UsageLimit.lte(0))
            .add(
                Expr::col(coupon::Column::UsedCount)
                    .lt(Expr::col(coupon::Column::UsageLimit)),
            );

        Coupon::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupon::Column::Code.eq(code))
            .filter(under_limit)
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CouponRedeemed { code: code.to_string() })
            .await;
        Ok(())
    }
}
