//! JWT authentication.
//!
//! Login is delegated to Google sign-in on the frontend; the backend only
//! upserts the account and mints a bearer token with the email as subject.
//! Request extractors resolve the token back to a database user, so a
//! deleted account is locked out as soon as its token is next used.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::user::{self, Entity as User};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::AppState;

/// JWT claim set. `sub` carries the user's email.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoogleLoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub picture: Option<String>,
}

/// Database-backed identity attached to a request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub is_admin: bool,
}

impl From<user::Model> for AuthenticatedUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            picture: model.picture,
            is_admin: model.is_admin,
        }
    }
}

/// Extractor that additionally requires the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        jwt_secret: String,
        token_ttl_minutes: i64,
    ) -> Self {
        Self {
            db,
            event_sender,
            jwt_secret,
            token_ttl: Duration::minutes(token_ttl_minutes),
        }
    }

    /// Upsert the account and mint a token. `as_admin` is used by the admin
    /// console login and promotes an existing non-admin account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login_with_google(
        &self,
        input: GoogleLoginInput,
        as_admin: bool,
    ) -> Result<TokenResponse, ServiceError> {
        input.validate()?;

        let existing = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;

        let user = match existing {
            Some(found) => {
                if as_admin && !found.is_admin {
                    let id = found.id;
                    let mut model: user::ActiveModel = found.into();
                    model.is_admin = Set(true);
                    let promoted = model.update(&*self.db).await?;
                    self.event_sender
                        .send_or_log(Event::UserPromotedToAdmin { user_id: id })
                        .await;
                    promoted
                } else {
                    found
                }
            }
            None => {
                let model = user::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(input.email.clone()),
                    name: Set(input.name.clone()),
                    picture: Set(input.picture.clone()),
                    is_admin: Set(as_admin),
                    created_at: Set(Utc::now()),
                };
                model.insert(&*self.db).await?
            }
        };

        self.event_sender
            .send_or_log(Event::UserLoggedIn {
                user_id: user.id,
                email: user.email.clone(),
            })
            .await;

        Ok(TokenResponse {
            access_token: self.issue_token(&user.email)?,
            token_type: "bearer".to_string(),
        })
    }

    pub fn issue_token(&self, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::AuthError(format!("Token creation failed: {}", e)))
    }

    /// Decode the token and resolve the subject to a live account.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, ServiceError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            debug!("JWT decode error: {}", e);
            ServiceError::AuthError("Could not validate credentials".into())
        })?
        .claims;

        let user = User::find()
            .filter(user::Column::Email.eq(claims.sub))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Could not validate credentials".into()))?;

        Ok(user.into())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::AuthError("Could not validate credentials".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.services.auth.authenticate(token).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ServiceError::Forbidden("Not authorized".into()));
        }
        Ok(AdminUser(user))
    }
}
