use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{Claims, MeResponse, RegisterRequest, TokenRequest, TokenResponse},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn issue_token(user_id: Uuid, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("username is required".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("password is required".into()));
    }

    let exist = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("username is already taken".into()));
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(payload.email.filter(|e| !e.trim().is_empty())),
        password_hash: Set(hash_password(&payload.password)?),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        User {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: Vec::new(),
            created_at: user.created_at.with_timezone(&Utc),
        },
        None,
    ))
}

pub async fn obtain_token(
    state: &AppState,
    payload: TokenRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let TokenRequest { username, password } = payload;
    if username.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".into(),
        ));
    }

    let user = Users::find()
        .filter(UserCol::Username.eq(username.trim()))
        .one(&state.orm)
        .await?;
    let user = match user {
        Some(u) => u,
        None => {
            return Err(AppError::Validation(
                "Unable to log in with provided credentials".into(),
            ));
        }
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Validation(
            "Unable to log in with provided credentials".into(),
        ));
    }

    let token = issue_token(user.id, &state.jwt_secret, state.token_ttl_hours)?;

    audit::record(
        &state.pool,
        user.id,
        "token_issued",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Token issued",
        TokenResponse { token },
        Some(Meta::empty()),
    ))
}

pub fn me(user: &AuthUser) -> ApiResponse<MeResponse> {
    ApiResponse::success(
        "Me",
        MeResponse {
            id: user.user_id,
            username: user.username.clone(),
            roles: user.roles.roles(),
        },
        Some(Meta::empty()),
    )
}
