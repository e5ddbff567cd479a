//! Keyed site content. Only the hero slot exists today; reads fall back to
//! a built-in default so the storefront always has something to render.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::site_content::{self, Entity as SiteContent, MediaKind};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub const HERO_KEY: &str = "hero";

const DEFAULT_HERO_URL: &str =
    "https://images.unsplash.com/photo-1483985988355-763728e1935b?w=1920&q=80";
const DEFAULT_HERO_ALT: &str = "Fashion Model";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateHeroInput {
    pub kind: MediaKind,
    #[validate(length(min = 1))]
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Clone)]
pub struct ContentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Current hero block, or the default when none has been saved yet.
    pub async fn hero(&self) -> Result<site_content::Model, ServiceError> {
        if let Some(existing) = SiteContent::find()
            .filter(site_content::Column::Key.eq(HERO_KEY))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }
        Ok(site_content::Model {
            id: Uuid::new_v4(),
            key: HERO_KEY.to_string(),
            kind: MediaKind::Image,
            url: DEFAULT_HERO_URL.to_string(),
            alt: Some(DEFAULT_HERO_ALT.to_string()),
            updated_at: Utc::now(),
        })
    }

    /// Upsert the hero block.
    #[instrument(skip(self, input))]
    pub async fn update_hero(
        &self,
        input: UpdateHeroInput,
    ) -> Result<site_content::Model, ServiceError> {
        input.validate()?;

        let existing = SiteContent::find()
            .filter(site_content::Column::Key.eq(HERO_KEY))
            .one(&*self.db)
            .await?;

        let saved = match existing {
            Some(model) => {
                let mut active: site_content::ActiveModel = model.into();
                active.kind = Set(input.kind);
                active.url = Set(input.url);
                active.alt = Set(input.alt);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?
            }
            None => {
                let model = site_content::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    key: Set(HERO_KEY.to_string()),
                    kind: Set(input.kind),
                    url: Set(input.url),
                    alt: Set(input.alt),
                    updated_at: Set(Utc::now()),
                };
                model.insert(&*self.db).await?
            }
        };

        self.event_sender.send_or_log(Event::HeroContentUpdated).await;
        Ok(saved)
    }
}
