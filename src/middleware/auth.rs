use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    authz::{Decision, Op, Resource, RoleSet, authorize},
    dto::auth::Claims,
    entity::Users,
    error::{AppError, AppResult},
    services::group_service::roles_for,
    state::AppState,
};

/// An authenticated caller with the staff roles held at request time.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub roles: RoleSet,
}

impl AuthUser {
    pub fn can(&self, resource: Resource, op: Op) -> Decision {
        authorize(self.roles, resource, op)
    }

    pub fn ensure(&self, resource: Resource, op: Op) -> AppResult<()> {
        self.can(resource, op).require()
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))?
        .trim();
    if token.is_empty() { None } else { Some(token) }
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Uuid> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthenticated)?;

    Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthenticated)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let user_id = decode_token(token, &state.jwt_secret)?;

        let user = Users::find_by_id(user_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        let roles = roles_for(&state.orm, user.id).await?;

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            roles,
        })
    }
}
